//! Collaborators the launchers shell out through.
//!
//! Both traits are injected so that resolution and image handling can be
//! exercised without docker, podman or sandbox-exec installed.

use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;

/// Answers "is this executable on the search path?".
#[cfg_attr(test, automock)]
pub trait ExecutableProbe {
    fn exists(&self, command: &str) -> bool;
}

/// Looks executables up on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathProbe;

impl ExecutableProbe for PathProbe {
    fn exists(&self, command: &str) -> bool {
        which::which(command).is_ok()
    }
}

/// Runs an external command to completion.
#[cfg_attr(test, automock)]
pub trait CommandRunner {
    /// Run with output captured and return stdout. A non-zero exit is an
    /// error carrying stderr.
    fn capture(&self, program: &str, args: &[String]) -> std::io::Result<String>;

    /// Run with stdio inherited so progress is visible on the terminal.
    /// A non-zero exit is reported as an error.
    fn stream(&self, program: &str, args: &[String]) -> std::io::Result<()>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn capture(&self, program: &str, args: &[String]) -> std::io::Result<String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(std::io::Error::other(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    fn stream(&self, program: &str, args: &[String]) -> std::io::Result<()> {
        let status = Command::new(program).args(args).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(std::io::Error::other(format!(
                "{} exited with {}",
                program, status
            )))
        }
    }
}
