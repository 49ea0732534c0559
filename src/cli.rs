use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tgrab")]
#[command(about = "Hand torrents to a local download agent and follow them to completion")]
#[command(long_about = "
tgrab submits torrents to a qBittorrent instance through its Web API. When no
agent answers, it downloads the .torrent file into the agent's watch folder
instead, then follows the download until it completes.

Targets are torrent hashes, HASH=Title pairs, or magnet URIs.

Examples:
  tgrab grab 0123456789ABCDEF0123456789ABCDEF01234567
  tgrab grab '0123456789ABCDEF0123456789ABCDEF01234567=Big Buck Bunny'
  tgrab watch 0123456789ABCDEF0123456789ABCDEF01234567
  tgrab config validate
")]
#[command(version)]
pub struct Cli {
    /// Override config file path
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit torrents to the download agent and follow them
    #[command(visible_alias = "g")]
    Grab {
        /// Torrent hashes, HASH=Title pairs or magnet URIs
        #[arg(required = true, value_name = "TARGET")]
        targets: Vec<String>,

        /// Directory the agent should save into
        #[arg(short, long, value_name = "DIR")]
        #[arg(help = "Save path handed to the agent (defaults to paths.download_dir)")]
        save_path: Option<PathBuf>,
    },

    /// Follow a torrent that is already in the download agent
    #[command(visible_alias = "w")]
    Watch {
        /// Torrent hash
        #[arg(value_name = "HASH")]
        hash: String,
    },

    /// Manage configuration
    #[command(visible_alias = "cfg")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,

    /// Print the config file location
    Path,

    /// Check the configuration for errors
    Validate,

    /// Restore the default configuration
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    /// Validate CLI arguments beyond what clap enforces
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Commands::Grab { targets, .. } => {
                if targets.iter().any(|t| t.trim().is_empty()) {
                    return Err("Targets cannot be empty".to_string());
                }
            }
            Commands::Watch { hash } => {
                if hash.trim().is_empty() {
                    return Err("Hash cannot be empty".to_string());
                }
            }
            Commands::Config { .. } => {}
        }
        Ok(())
    }

    /// Config validation is skipped for commands that inspect or repair it
    pub fn skips_config_validation(&self) -> bool {
        matches!(self.command, Commands::Config { .. })
    }
}
