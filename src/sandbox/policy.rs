use std::env::VarError;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::detect::{Platform, is_inside_sandbox};
use super::error::{Result, SandboxError};
use super::probe::ExecutableProbe;
use super::{SANDBOX_OVERRIDE_ENV, env_value};

/// The user's sandbox request, after CLI flag and settings file have been merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SandboxOption {
    /// Nobody said anything.
    #[default]
    Unset,
    /// Turn sandboxing on or off, letting the platform pick the backend.
    Enabled(bool),
    /// A raw string value: `"1"`/`"true"`, `"0"`/`"false"`/`""`, or a backend name.
    Named(String),
}

impl From<bool> for SandboxOption {
    fn from(value: bool) -> Self {
        SandboxOption::Enabled(value)
    }
}

impl From<&str> for SandboxOption {
    fn from(value: &str) -> Self {
        SandboxOption::Named(value.to_string())
    }
}

/// An isolation mechanism we know how to relaunch into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Docker,
    Podman,
    SandboxExec,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Docker, Backend::Podman, Backend::SandboxExec];

    /// Executable that implements this backend.
    pub fn command(self) -> &'static str {
        match self {
            Backend::Docker => "docker",
            Backend::Podman => "podman",
            Backend::SandboxExec => "sandbox-exec",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, Backend::Docker | Backend::Podman)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for Backend {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self> {
        Backend::ALL
            .into_iter()
            .find(|b| b.command() == s)
            .ok_or_else(|| SandboxError::InvalidBackendName {
                name: s.to_string(),
            })
    }
}

/// What the option asks for once interpreted.
#[derive(Debug, PartialEq, Eq)]
enum Request {
    Disabled,
    Generic,
    Explicit(String),
}

fn interpret(option: &SandboxOption) -> Request {
    match option {
        SandboxOption::Unset | SandboxOption::Enabled(false) => Request::Disabled,
        SandboxOption::Enabled(true) => Request::Generic,
        SandboxOption::Named(raw) => {
            let value = raw.trim().to_lowercase();
            match value.as_str() {
                "1" | "true" => Request::Generic,
                "0" | "false" | "" => Request::Disabled,
                _ => Request::Explicit(value),
            }
        }
    }
}

/// Decide which backend, if any, to relaunch into.
///
/// `Ok(None)` means "run unsandboxed". The outcome depends only on the four
/// inputs: the option, the environment lookup, the platform, and the probe.
pub fn resolve_backend<F>(
    option: &SandboxOption,
    env_fn: &F,
    platform: Platform,
    probe: &dyn ExecutableProbe,
) -> Result<Option<Backend>>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    if is_inside_sandbox(env_fn) {
        debug!("Already inside a sandbox, not relaunching");
        return Ok(None);
    }

    let (option, origin) = match env_value(env_fn, SANDBOX_OVERRIDE_ENV) {
        Some(value) => (SandboxOption::Named(value), SANDBOX_OVERRIDE_ENV),
        None => (option.clone(), "sandbox option"),
    };

    match interpret(&option) {
        Request::Disabled => return Ok(None),
        Request::Explicit(name) => {
            let backend: Backend = name.parse()?;
            if !probe.exists(backend.command()) {
                return Err(SandboxError::MissingExecutable {
                    command: backend.command().to_string(),
                    origin: origin.to_string(),
                });
            }
            debug!("Using explicitly requested sandbox command {}", backend);
            return Ok(Some(backend));
        }
        Request::Generic => {}
    }

    let mut candidates = Vec::with_capacity(3);
    if platform.has_native_sandbox() {
        candidates.push(Backend::SandboxExec);
    }
    candidates.extend([Backend::Docker, Backend::Podman]);

    for backend in candidates {
        let found = probe.exists(backend.command());
        debug!("Probed {}: {}", backend, if found { "found" } else { "missing" });
        if found {
            return Ok(Some(backend));
        }
    }

    Err(SandboxError::NoBackendAvailable)
}
