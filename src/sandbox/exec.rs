use std::convert::Infallible;
use std::path::PathBuf;

use super::error::{Result, SandboxError};
use super::invocation::Invocation;

/// Replaces the running process with an [`Invocation`].
///
/// The success type is uninhabited: a successful call never comes back, so
/// anything written after it only runs on failure.
pub trait ProcessReplacer {
    fn replace(&self, invocation: Invocation) -> Result<Infallible>;
}

/// `execve` through `std::os::unix::process::CommandExt::exec`.
///
/// The new program keeps our pid, stdio and controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecReplacer;

impl ProcessReplacer for ExecReplacer {
    fn replace(&self, invocation: Invocation) -> Result<Infallible> {
        let path = which::which(&invocation.program)
            .map_err(|_| SandboxError::ExecutableNotFound(invocation.program.clone()))?;

        Err(exec_path(path, invocation))
    }
}

#[cfg(unix)]
fn exec_path(path: PathBuf, invocation: Invocation) -> SandboxError {
    use std::os::unix::process::CommandExt;

    let source = std::process::Command::new(&path)
        .arg0(&invocation.program)
        .args(&invocation.args)
        .env_clear()
        .envs(&invocation.env)
        .exec();

    // exec() only returns on error
    SandboxError::ProcessReplacementFailed {
        program: path,
        source,
    }
}

#[cfg(not(unix))]
fn exec_path(path: PathBuf, _invocation: Invocation) -> SandboxError {
    SandboxError::ProcessReplacementFailed {
        program: path,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process replacement requires a unix host",
        ),
    }
}
