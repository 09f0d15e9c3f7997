//! XDG Base Directory compliant location of the settings file.
//!
//! The config directory is resolved through a three-level fallback:
//! 1. `HOPBOX_CONFIG_DIR`
//! 2. `XDG_CONFIG_HOME` via `etcetera`
//! 3. Platform default (~/.config)
//!
//! Relative paths from env vars are ignored per XDG spec.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Resolved directory paths for the application.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Config directory: config.toml lives here
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve all paths using real environment variables.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with_env(|key| std::env::var(key))
    }

    /// Resolve paths with a custom env var lookup (for testing).
    pub fn resolve_with_env<F>(env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        use etcetera::BaseStrategy;

        let strategy = etcetera::choose_base_strategy()
            .map_err(|e| anyhow::anyhow!("Failed to determine base directories: {}", e))?;

        let config_dir = env_or(&env_fn, "HOPBOX_CONFIG_DIR", || {
            strategy.config_dir().join("hopbox")
        });

        Ok(Self { config_dir })
    }

    /// Config file: config_dir/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Create the config directory with mode 0700.
    pub fn ensure_dirs(&self) -> Result<()> {
        create_dir_with_mode(&self.config_dir)
    }
}

/// Resolve an env var with fallback. Ignores empty and relative paths per XDG spec.
fn env_or<F>(env_fn: &F, var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    env_fn(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_absolute()) // XDG spec: ignore relative paths
        .unwrap_or_else(default)
}

fn create_dir_with_mode(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Helper: build an env_fn from a HashMap
    fn make_env(
        map: HashMap<&str, &str>,
    ) -> impl Fn(&str) -> std::result::Result<String, std::env::VarError> {
        move |key: &str| {
            map.get(key)
                .map(|v| v.to_string())
                .ok_or(std::env::VarError::NotPresent)
        }
    }

    #[test]
    fn default_config_dir_is_xdg_compliant() {
        let paths = Paths::resolve_with_env(make_env(HashMap::new())).unwrap();
        assert!(
            paths.config_dir.ends_with("hopbox"),
            "config_dir: {:?}",
            paths.config_dir
        );
        assert!(paths.config_file().ends_with("hopbox/config.toml"));
    }

    #[test]
    fn env_var_overrides_xdg() {
        let mut env: HashMap<&str, &str> = HashMap::new();
        env.insert("HOPBOX_CONFIG_DIR", "/custom/config");

        let paths = Paths::resolve_with_env(make_env(env)).unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/custom/config"));
    }

    #[test]
    fn relative_and_empty_values_are_ignored() {
        for value in ["relative/path", ""] {
            let mut env: HashMap<&str, &str> = HashMap::new();
            env.insert("HOPBOX_CONFIG_DIR", value);

            let paths = Paths::resolve_with_env(make_env(env)).unwrap();
            assert!(paths.config_dir.is_absolute());
            assert!(paths.config_dir.ends_with("hopbox"));
        }
    }

    #[test]
    fn ensure_dirs_creates_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: tmp.path().join("nested").join("hopbox"),
        };
        paths.ensure_dirs().unwrap();
        assert!(paths.config_dir.is_dir());
    }
}
