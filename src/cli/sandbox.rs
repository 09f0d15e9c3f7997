use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::Config;
use crate::sandbox::profile::{
    INCLUDE_DIR_SLOTS, profile_names, profile_template, resolve_profile_name,
};
use crate::sandbox::{
    BackendAvailability, DEFAULT_PROFILE, PathProbe, Platform, build_launch_config,
};

use super::Cli;

#[derive(Args)]
pub struct SandboxArgs {
    #[command(subcommand)]
    pub command: SandboxCommands,
}

#[derive(Subcommand)]
pub enum SandboxCommands {
    /// Show backend availability and what a relaunch would do
    Status,

    /// List bundled Seatbelt profiles
    Profiles,

    /// Print a bundled Seatbelt profile
    ShowProfile {
        /// Profile name (e.g. permissive-open)
        name: String,
    },
}

pub fn run(args: &SandboxArgs, cli: &Cli, config: &Config) -> Result<()> {
    match &args.command {
        SandboxCommands::Status => run_status(cli, config),
        SandboxCommands::Profiles => run_profiles(),
        SandboxCommands::ShowProfile { name } => {
            let template = profile_template(name)?;
            print!("{}", String::from_utf8_lossy(&template));
            Ok(())
        }
    }
}

fn run_status(cli: &Cli, config: &Config) -> Result<()> {
    let env_fn = |key: &str| std::env::var(key);
    let platform = Platform::current();
    let availability = BackendAvailability::probe(&env_fn, platform, &PathProbe);

    println!("Sandbox Backends:");
    for line in availability.status_lines() {
        println!("{}", line);
    }
    println!();

    let request = config.sandbox_request(cli.sandbox.as_deref(), cli.sandbox_image.as_deref());

    println!("Configuration:");
    println!("  Option:        {:?}", request.option);
    println!(
        "  Image:         {}",
        request.image.as_deref().unwrap_or("(not set)")
    );
    println!("  Default image: {}", request.default_image);
    if !request.include_dirs.is_empty() {
        println!("  Include dirs:  {:?}", request.include_dirs);
        if request.include_dirs.len() > INCLUDE_DIR_SLOTS {
            println!(
                "                 (only the first {} are used)",
                INCLUDE_DIR_SLOTS
            );
        }
    }
    println!();

    print!("Resolution:    ");
    match build_launch_config(&request, &env_fn, platform, &PathProbe) {
        Ok(None) => println!("no sandbox"),
        Ok(Some(launch)) if launch.backend().is_container() => {
            println!("{} with image {}", launch.backend(), launch.image())
        }
        Ok(Some(launch)) => println!(
            "{} with profile {}",
            launch.backend(),
            resolve_profile_name(&env_fn)
        ),
        Err(e) => println!("error: {}", e),
    }

    Ok(())
}

fn run_profiles() -> Result<()> {
    for name in profile_names() {
        if name == DEFAULT_PROFILE {
            println!("{} (default)", name);
        } else {
            println!("{}", name);
        }
    }
    Ok(())
}
