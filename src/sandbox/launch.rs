use std::env::VarError;
use std::path::PathBuf;
use tracing::info;

use super::detect::Platform;
use super::error::{Result, SandboxError};
use super::policy::{Backend, SandboxOption, resolve_backend};
use super::probe::ExecutableProbe;
use super::{DEFAULT_IMAGE, SANDBOX_IMAGE_ENV, env_value};

/// Everything the caller knows about the sandbox request before the
/// environment and platform are consulted.
#[derive(Debug, Clone)]
pub struct SandboxRequest {
    pub option: SandboxOption,
    /// Explicit image (CLI flag, then settings file).
    pub image: Option<String>,
    /// Last-resort image; empty disables the fallback.
    pub default_image: String,
    /// Directories bound to the profile's `INCLUDE_DIR_<n>` parameters.
    pub include_dirs: Vec<PathBuf>,
}

impl Default for SandboxRequest {
    fn default() -> Self {
        Self {
            option: SandboxOption::Unset,
            image: None,
            default_image: DEFAULT_IMAGE.to_string(),
            include_dirs: Vec::new(),
        }
    }
}

/// Resolved backend and image. Built once, never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    backend: Backend,
    image: String,
}

impl LaunchConfig {
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Container image; empty for `sandbox-exec`.
    pub fn image(&self) -> &str {
        &self.image
    }
}

/// Turn a request into a launch config, or `None` when sandboxing is off.
pub fn build_launch_config<F>(
    request: &SandboxRequest,
    env_fn: &F,
    platform: Platform,
    probe: &dyn ExecutableProbe,
) -> Result<Option<LaunchConfig>>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    let Some(backend) = resolve_backend(&request.option, env_fn, platform, probe)? else {
        return Ok(None);
    };

    if !backend.is_container() {
        info!("Sandbox command: {}", backend);
        return Ok(Some(LaunchConfig {
            backend,
            image: String::new(),
        }));
    }

    let image = resolve_image(request.image.as_deref(), env_fn, &request.default_image)
        .ok_or_else(|| SandboxError::MissingImageConfiguration {
            backend: backend.to_string(),
        })?;

    info!("Sandbox command: {}, image: {}", backend, image);
    Ok(Some(LaunchConfig { backend, image }))
}

/// Explicit image, then `HOPBOX_SANDBOX_IMAGE`, then the default.
fn resolve_image<F>(explicit: Option<&str>, env_fn: &F, default_image: &str) -> Option<String>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| env_value(env_fn, SANDBOX_IMAGE_ENV))
        .or_else(|| Some(default_image.trim().to_string()).filter(|s| !s.is_empty()))
}
