use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::convert::Infallible;
use std::env::VarError;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::{Result, SandboxError};
use super::exec::ProcessReplacer;
use super::invocation::{Invocation, LaunchContext};
use super::policy::Backend;
use super::{DEFAULT_PROFILE, SEATBELT_PROFILE_ENV, env_value};

/// Number of `INCLUDE_DIR_<n>` parameters every bundled profile references.
pub const INCLUDE_DIR_SLOTS: usize = 5;

/// Bound to include slots nobody filled; matches nothing useful.
const INERT_INCLUDE_DIR: &str = "/dev/null";

#[derive(RustEmbed)]
#[folder = "src/sandbox/profiles/"]
struct BundledProfiles;

/// Names of all bundled Seatbelt profiles, sorted.
pub fn profile_names() -> Vec<String> {
    let mut names: Vec<String> = BundledProfiles::iter()
        .filter_map(|file| file.strip_suffix(".sb").map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Raw SBPL text of a bundled profile.
pub fn profile_template(name: &str) -> Result<Cow<'static, [u8]>> {
    let unknown = || SandboxError::UnknownProfileName {
        name: name.to_string(),
    };

    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(unknown());
    }

    BundledProfiles::get(&format!("{}.sb", name))
        .map(|file| file.data)
        .ok_or_else(unknown)
}

/// `SEATBELT_PROFILE`, or the permissive default.
pub fn resolve_profile_name<F>(env_fn: &F) -> String
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    env_value(env_fn, SEATBELT_PROFILE_ENV).unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// Host directories substituted into the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDirs {
    pub tmp: PathBuf,
    pub home: PathBuf,
    pub cache: PathBuf,
}

impl HostDirs {
    pub fn resolve() -> Result<Self> {
        let base = directories::BaseDirs::new()
            .ok_or(SandboxError::HomeOrCacheDirUnavailable("home"))?;

        Ok(Self {
            tmp: std::env::temp_dir(),
            home: base.home_dir().to_path_buf(),
            cache: base.cache_dir().to_path_buf(),
        })
    }
}

/// Relaunches under `sandbox-exec -f <profile>`.
pub struct ProfileLauncher<'a> {
    replacer: &'a dyn ProcessReplacer,
    include_dirs: &'a [PathBuf],
}

impl<'a> ProfileLauncher<'a> {
    pub fn new(replacer: &'a dyn ProcessReplacer, include_dirs: &'a [PathBuf]) -> Self {
        Self {
            replacer,
            include_dirs,
        }
    }

    pub fn launch<F>(&self, env_fn: &F, ctx: &LaunchContext, dirs: &HostDirs) -> Result<Infallible>
    where
        F: Fn(&str) -> std::result::Result<String, VarError>,
    {
        let name = resolve_profile_name(env_fn);
        let template = profile_template(&name)?;

        // Dropping the guard deletes the file. After a successful exec nothing
        // runs, so the file is left in the temp dir for the OS to reclaim.
        let profile_file = write_profile(&template, &dirs.tmp)?;
        debug!("Wrote profile {} to {}", name, profile_file.path().display());

        eprintln!(
            "hopping into sandbox (command: {}, profile: {}) ...",
            Backend::SandboxExec,
            name
        );

        let invocation = build_invocation(profile_file.path(), ctx, dirs, self.include_dirs);
        let result = self.replacer.replace(invocation);
        drop(profile_file);
        result
    }
}

fn write_profile(template: &[u8], tmp_dir: &Path) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("sandbox-profile-")
        .suffix(".sb")
        .tempfile_in(tmp_dir)
        .map_err(|source| SandboxError::ProfileFileIo {
            action: "create",
            source,
        })?;

    file.write_all(template)
        .and_then(|_| file.flush())
        .map_err(|source| SandboxError::ProfileFileIo {
            action: "write to",
            source,
        })?;

    Ok(file)
}

/// `sandbox-exec -f <profile> -D NAME=value... <argv0> <args...>`
pub fn build_invocation(
    profile_path: &Path,
    ctx: &LaunchContext,
    dirs: &HostDirs,
    include_dirs: &[PathBuf],
) -> Invocation {
    let backend = Backend::SandboxExec.command();
    let mut invocation = Invocation::new(backend, ctx.env_with_marker(backend));

    invocation.arg("-f").arg(profile_path.as_os_str());

    for (name, path) in [
        ("TARGET_DIR", ctx.cwd.as_path()),
        ("TMP_DIR", dirs.tmp.as_path()),
        ("HOME_DIR", dirs.home.as_path()),
        ("CACHE_DIR", dirs.cache.as_path()),
    ] {
        invocation.arg("-D").arg(define(name, path));
    }

    if include_dirs.len() > INCLUDE_DIR_SLOTS {
        warn!(
            "Only {} include directories are supported; ignoring {:?}",
            INCLUDE_DIR_SLOTS,
            &include_dirs[INCLUDE_DIR_SLOTS..]
        );
    }
    for slot in 0..INCLUDE_DIR_SLOTS {
        let path = include_dirs
            .get(slot)
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new(INERT_INCLUDE_DIR));
        invocation
            .arg("-D")
            .arg(define(&format!("INCLUDE_DIR_{}", slot), path));
    }

    invocation.arg(ctx.exe.clone());
    invocation.args(ctx.args.iter().cloned());
    invocation
}

fn define(name: &str, path: &Path) -> OsString {
    let mut value = OsString::from(name);
    value.push("=");
    value.push(path.as_os_str());
    value
}
