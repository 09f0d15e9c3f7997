use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use crate::sandbox::SANDBOX_MARKER_ENV;

#[derive(Args)]
pub struct RunArgs {
    /// Command and arguments to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Run the command and return its exit code.
pub fn run(args: &RunArgs) -> Result<i32> {
    let (program, rest) = args
        .command
        .split_first()
        .context("No command given")?;

    match std::env::var(SANDBOX_MARKER_ENV) {
        Ok(backend) if !backend.is_empty() => debug!("Running {} inside {}", program, backend),
        _ => debug!("Running {} without a sandbox", program),
    }

    let status = std::process::Command::new(program)
        .args(rest)
        .status()
        .with_context(|| format!("Failed to run {}", program))?;

    Ok(exit_code(status))
}

/// Killed by a signal: report `128 + signal` the way shells do.
#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
