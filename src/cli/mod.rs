pub mod paths;
pub mod run;
pub mod sandbox;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::sandbox::{
    ExecReplacer, HostDirs, LaunchContext, PathProbe, Platform, SystemRunner, build_launch_config,
    start,
};

#[derive(Parser)]
#[command(name = "hopbox")]
#[command(author, version, about = "Run commands after hopping into a sandbox")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Run in a sandbox: bare flag for auto-detection, or docker | podman | sandbox-exec
    #[arg(
        short,
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "COMMAND"
    )]
    pub sandbox: Option<String>,

    /// The sandbox image to use
    #[arg(long, global = true, value_name = "IMAGE")]
    pub sandbox_image: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "HOPBOX_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command, inside the sandbox when one is configured
    Run(run::RunArgs),

    /// Inspect sandbox resolution and bundled profiles
    Sandbox(sandbox::SandboxArgs),

    /// Show resolved config paths
    Paths,
}

impl Commands {
    /// Inspection commands run on the host as-is.
    pub fn enters_sandbox(&self) -> bool {
        matches!(self, Commands::Run(_))
    }
}

/// Relaunch inside the configured sandbox. Returns only when no sandbox is
/// wanted (or we are already in one); every other outcome is an error.
pub fn maybe_relaunch(cli: &Cli, config: &Config) -> Result<()> {
    let request = config.sandbox_request(cli.sandbox.as_deref(), cli.sandbox_image.as_deref());
    let env_fn = |key: &str| std::env::var(key);

    let launch = build_launch_config(&request, &env_fn, Platform::current(), &PathProbe)
        .context("failed to load sandbox config")?;
    let Some(launch) = launch else {
        return Ok(());
    };

    let ctx = LaunchContext::capture().context("failed to start sandbox")?;
    match start(
        &launch,
        &ctx,
        &env_fn,
        &request.include_dirs,
        HostDirs::resolve,
        &SystemRunner,
        &ExecReplacer,
    ) {
        Ok(never) => match never {},
        Err(e) => Err(e).context("failed to start sandbox"),
    }
}
