use anyhow::Result;
use clap::Parser;

use hopbox::cli::{self, Cli, Commands};
use hopbox::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // Decide on the sandbox before doing any real work. On a successful
    // relaunch this never returns.
    if cli.command.enters_sandbox() {
        cli::maybe_relaunch(&cli, &config)?;
    }

    match &cli.command {
        Commands::Run(args) => {
            let code = cli::run::run(args)?;
            std::process::exit(code);
        }
        Commands::Sandbox(args) => cli::sandbox::run(args, &cli, &config),
        Commands::Paths => cli::paths::run(&config),
    }
}
