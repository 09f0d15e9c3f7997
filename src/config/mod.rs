use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::paths::Paths;
use crate::sandbox::{DEFAULT_IMAGE, SandboxOption, SandboxRequest};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// File this config was loaded from (not serialized)
    #[serde(skip)]
    pub path: PathBuf,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `enabled = true` or `enabled = "podman"` in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SandboxSetting {
    Bool(bool),
    Name(String),
}

impl From<SandboxSetting> for SandboxOption {
    fn from(setting: SandboxSetting) -> Self {
        match setting {
            SandboxSetting::Bool(b) => SandboxOption::Enabled(b),
            SandboxSetting::Name(s) => SandboxOption::Named(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// true | false | "docker" | "podman" | "sandbox-exec" (default: unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<SandboxSetting>,

    /// Container image, used when --sandbox-image is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Fallback image when nothing else names one ("" disables the fallback)
    #[serde(default = "default_image")]
    pub default_image: String,

    /// Extra writable directories for Seatbelt profiles (at most 5 are used)
    #[serde(default)]
    pub include_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            image: None,
            default_image: default_image(),
            include_dirs: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from `explicit` if given, else from the XDG config file.
    ///
    /// A missing default config file is created from the template; a missing
    /// explicit one is an error.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            let expanded = shellexpand::tilde(path);
            return Self::load_from(Path::new(expanded.as_ref()));
        }

        let paths = Paths::resolve()?;
        let path = paths.config_file();

        if !path.exists() {
            paths.ensure_dirs()?;
            let config = Config {
                path,
                ..Config::default()
            };
            config.save_with_template()?;
            return Ok(config);
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.path = path.to_path_buf();
        Ok(config)
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", self.path.display());

        Ok(())
    }

    /// Merge CLI flags over the settings file. A flag that was given always
    /// wins; environment overrides are applied later by the resolver.
    pub fn sandbox_request(&self, flag: Option<&str>, image_flag: Option<&str>) -> SandboxRequest {
        let option = match flag {
            Some(value) => SandboxOption::Named(value.to_string()),
            None => self
                .sandbox
                .enabled
                .clone()
                .map(SandboxOption::from)
                .unwrap_or_default(),
        };

        let image = image_flag
            .map(str::to_string)
            .or_else(|| self.sandbox.image.clone())
            .filter(|s| !s.trim().is_empty());

        let include_dirs = self
            .sandbox
            .include_dirs
            .iter()
            .filter_map(|p| expand_include_dir(p))
            .collect();

        SandboxRequest {
            option,
            image,
            default_image: self.sandbox.default_image.clone(),
            include_dirs,
        }
    }
}

/// Expand `~` and `$VARS`. Seatbelt `subpath` only matches absolute paths, so
/// anything else is skipped here rather than failing inside `sandbox-exec`.
fn expand_include_dir(raw: &str) -> Option<PathBuf> {
    let expanded = match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            warn!("Ignoring include dir {:?}: {}", raw, e);
            return None;
        }
    };

    if !expanded.is_absolute() {
        warn!("Ignoring include dir {:?}: not an absolute path", raw);
        return None;
    }
    Some(expanded)
}

/// Default config template with helpful comments (used for first-time setup)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# hopbox configuration
# Auto-created on first run. Edit as needed.

[sandbox]
# Relaunch inside a sandbox before doing anything else.
#   true / false           pick a backend automatically (or don't sandbox)
#   "docker" | "podman"    container engine
#   "sandbox-exec"         macOS Seatbelt profile
# The --sandbox flag beats this value; HOPBOX_SANDBOX beats both.
# enabled = true

# Container image (the --sandbox-image flag and HOPBOX_SANDBOX_IMAGE win over it)
# image = "ghcr.io/hopbox/sandbox:latest"

# Image used when nothing else names one. "" means: require an explicit image.
# default_image = "ghcr.io/hopbox/sandbox:latest"

# Extra writable directories for sandbox-exec profiles (up to 5, absolute
# after ~ and $VAR expansion; anything else is ignored)
# include_dirs = ["~/.cargo", "/opt/sdk"]

[logging]
level = "info"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.sandbox.enabled, None);
        assert_eq!(config.sandbox.default_image, DEFAULT_IMAGE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn enabled_accepts_bool_or_string() {
        let config: Config = toml::from_str("[sandbox]\nenabled = true\n").unwrap();
        assert_eq!(config.sandbox.enabled, Some(SandboxSetting::Bool(true)));

        let config: Config = toml::from_str("[sandbox]\nenabled = \"podman\"\n").unwrap();
        assert_eq!(
            config.sandbox.enabled,
            Some(SandboxSetting::Name("podman".to_string()))
        );
    }

    #[test]
    fn settings_used_when_no_flags() {
        let config: Config =
            toml::from_str("[sandbox]\nenabled = true\nimage = \"settings-image\"\n").unwrap();
        let request = config.sandbox_request(None, None);

        assert_eq!(request.option, SandboxOption::Enabled(true));
        assert_eq!(request.image.as_deref(), Some("settings-image"));
    }

    #[test]
    fn flags_beat_settings() {
        let config: Config =
            toml::from_str("[sandbox]\nenabled = \"docker\"\nimage = \"settings-image\"\n")
                .unwrap();
        let request = config.sandbox_request(Some("false"), Some("flag-image"));

        assert_eq!(request.option, SandboxOption::Named("false".to_string()));
        assert_eq!(request.image.as_deref(), Some("flag-image"));
    }

    #[test]
    fn unset_everywhere_is_unset() {
        let request = Config::default().sandbox_request(None, None);
        assert_eq!(request.option, SandboxOption::Unset);
        assert_eq!(request.image, None);
        assert_eq!(request.default_image, DEFAULT_IMAGE);
    }

    #[test]
    fn include_dirs_expand_tilde() {
        let config: Config =
            toml::from_str("[sandbox]\ninclude_dirs = [\"~/.cargo\", \"/opt/sdk\"]\n").unwrap();
        let request = config.sandbox_request(None, None);

        assert_eq!(request.include_dirs.len(), 2);
        assert!(request.include_dirs[0].is_absolute());
        assert!(request.include_dirs[0].ends_with(".cargo"));
        assert_eq!(request.include_dirs[1], PathBuf::from("/opt/sdk"));
    }

    #[test]
    fn relative_and_unresolved_include_dirs_are_skipped() {
        let config: Config = toml::from_str(
            "[sandbox]\ninclude_dirs = [\"build/out\", \"$HOPBOX_UNSET_TEST_VAR/x\", \"/opt/sdk\"]\n",
        )
        .unwrap();
        let request = config.sandbox_request(None, None);

        assert_eq!(request.include_dirs, vec![PathBuf::from("/opt/sdk")]);
    }

    #[test]
    fn load_from_file_records_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[sandbox]\nenabled = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.path, path);
        assert_eq!(config.sandbox.enabled, Some(SandboxSetting::Bool(false)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        assert!(Config::load(Some(path.to_str().unwrap())).is_err());
    }

    #[test]
    fn template_is_written() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            path: tmp.path().join("hopbox").join("config.toml"),
            ..Config::default()
        };
        config.save_with_template().unwrap();

        let reloaded = Config::load_from(&config.path).unwrap();
        assert_eq!(reloaded.sandbox.default_image, DEFAULT_IMAGE);
    }
}
