//! Sandbox relaunch - decide whether to re-execute inside an isolated
//! environment, and do it by replacing the current process image.
//!
//! Flow: [`policy::resolve_backend`] picks a backend from the merged option,
//! the environment and the platform; [`launch::build_launch_config`] pins the
//! image; then [`start`] hands off to the container or Seatbelt launcher,
//! which ends in [`exec::ProcessReplacer::replace`].
//!
//! Backends:
//! - docker / podman: `<engine> run` with the working directory bind-mounted
//! - sandbox-exec (macOS): a bundled Seatbelt profile written to a temp file

pub mod container;
pub mod detect;
pub mod error;
pub mod exec;
pub mod invocation;
pub mod launch;
pub mod policy;
pub mod probe;
pub mod profile;

use std::convert::Infallible;
use std::env::VarError;
use std::path::PathBuf;

pub use container::ContainerLauncher;
pub use detect::{BackendAvailability, Platform, is_inside_sandbox};
pub use error::SandboxError;
pub use exec::{ExecReplacer, ProcessReplacer};
pub use invocation::{Invocation, LaunchContext};
pub use launch::{LaunchConfig, SandboxRequest, build_launch_config};
pub use policy::{Backend, SandboxOption, resolve_backend};
pub use probe::{CommandRunner, ExecutableProbe, PathProbe, SystemRunner};
pub use profile::{HostDirs, ProfileLauncher};

/// Set in the relaunched environment; non-empty means "already sandboxed".
pub const SANDBOX_MARKER_ENV: &str = "SANDBOX";

/// Replaces the sandbox option wholesale when set.
pub const SANDBOX_OVERRIDE_ENV: &str = "HOPBOX_SANDBOX";

/// Image override; only an explicit image flag beats it.
pub const SANDBOX_IMAGE_ENV: &str = "HOPBOX_SANDBOX_IMAGE";

/// Selects the bundled Seatbelt profile.
pub const SEATBELT_PROFILE_ENV: &str = "SEATBELT_PROFILE";

pub const DEFAULT_IMAGE: &str = "ghcr.io/hopbox/sandbox:latest";

pub const DEFAULT_PROFILE: &str = "permissive-open";

/// Read an env var through the injected lookup, treating empty as unset.
pub(crate) fn env_value<F>(env_fn: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    env_fn(key).ok().filter(|v| !v.is_empty())
}

/// Hand off to the launcher for `config.backend()`.
///
/// `host_dirs` is only called for the Seatbelt backend (normally
/// [`HostDirs::resolve`]). Only ever returns an error: on success the process
/// image has been replaced.
pub fn start<F, D>(
    config: &LaunchConfig,
    ctx: &LaunchContext,
    env_fn: &F,
    include_dirs: &[PathBuf],
    host_dirs: D,
    runner: &dyn CommandRunner,
    replacer: &dyn ProcessReplacer,
) -> Result<Infallible, SandboxError>
where
    F: Fn(&str) -> Result<String, VarError>,
    D: FnOnce() -> Result<HostDirs, SandboxError>,
{
    if config.backend().is_container() {
        ContainerLauncher::new(runner, replacer).launch(config, ctx)
    } else {
        let dirs = host_dirs()?;
        ProfileLauncher::new(replacer, include_dirs).launch(env_fn, ctx, &dirs)
    }
}
