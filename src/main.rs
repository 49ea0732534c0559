mod cli;
mod handlers;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::process;
use torrent_grabber::ConfigManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Validate CLI arguments first
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    // Initialize logging based on verbosity; RUST_LOG wins when set
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config_manager = match &args.config {
        Some(path) => ConfigManager::load_from(path)?,
        None => ConfigManager::new()?,
    };

    if !args.skips_config_validation() {
        if let Err(e) = config_manager.validate() {
            eprintln!("Configuration validation failed: {}", e);
            eprintln!("Run 'tgrab config validate' for details or 'tgrab config reset' to start over");
            process::exit(1);
        }
    }

    let succeeded = match args.command {
        Commands::Grab { targets, save_path } => {
            let failures =
                handlers::handle_grab(config_manager.config(), targets, save_path).await?;
            failures == 0
        }
        Commands::Watch { hash } => handlers::handle_watch(config_manager.config(), hash).await?,
        Commands::Config { action } => {
            handlers::handle_config(&mut config_manager, action).await?
        }
    };

    if !succeeded {
        process::exit(1);
    }

    Ok(())
}
