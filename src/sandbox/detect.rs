use std::env::VarError;
use std::fmt;

use super::policy::Backend;
use super::probe::ExecutableProbe;
use super::{SANDBOX_MARKER_ENV, env_value};

/// Host platform, as far as backend selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Has the native Seatbelt facility (`sandbox-exec`).
    MacOs,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Whether `sandbox-exec` is a candidate for generic enablement here.
    pub fn has_native_sandbox(self) -> bool {
        self == Platform::MacOs
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Other => std::env::consts::OS,
        };
        f.write_str(name)
    }
}

/// True when the process already runs inside a sandbox launched by us.
///
/// The launchers set `SANDBOX` in the relaunched environment, so checking it
/// keeps a relaunched process from trying to sandbox itself again.
pub fn is_inside_sandbox<F>(env_fn: &F) -> bool
where
    F: Fn(&str) -> Result<String, VarError>,
{
    env_value(env_fn, SANDBOX_MARKER_ENV).is_some()
}

/// Backend availability snapshot for `sandbox status`.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    pub platform: Platform,
    pub inside_sandbox: Option<String>,
    pub backends: Vec<(Backend, bool)>,
}

impl BackendAvailability {
    pub fn probe<F>(env_fn: &F, platform: Platform, probe: &dyn ExecutableProbe) -> Self
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let backends = Backend::ALL
            .iter()
            .map(|backend| (*backend, probe.exists(backend.command())))
            .collect();

        Self {
            platform,
            inside_sandbox: env_value(env_fn, SANDBOX_MARKER_ENV),
            backends,
        }
    }

    /// Human-readable status lines for `sandbox status` command.
    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("  Platform:      {}", self.platform)];

        match &self.inside_sandbox {
            Some(backend) => lines.push(format!("  Inside:        yes ({})", backend)),
            None => lines.push("  Inside:        no".to_string()),
        }

        for (backend, found) in &self.backends {
            let note = if *backend == Backend::SandboxExec && !self.platform.has_native_sandbox()
            {
                " (not used for auto-selection on this platform)"
            } else {
                ""
            };
            let state = if *found { "found " } else { "missing" };
            lines.push(format!("  {:<14} {}{}", format!("{}:", backend), state, note));
        }

        lines
    }
}
