//! CLI argument definitions for nowplay.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// nowplay -- a Telegram bot that shows what you are listening to.
#[derive(Parser)]
#[command(
    name = "nowplay",
    version,
    about = "nowplay -- live \"now playing\" status for Telegram",
    long_about = "Keeps a Telegram message in sync with the media playing on this Mac, \
                  or with a manual status set by the bot's admin."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Telegram bot gateway.
    Bot {
        /// Telegram long-polling timeout in seconds.
        #[arg(long, default_value_t = 30)]
        poll_timeout: u64,

        /// Telegram user id allowed to /set and /clear (overrides
        /// NOWPLAY_ADMIN_ID and the config file).
        #[arg(long)]
        admin_id: Option<i64>,

        /// Path to the configuration file.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Print the current status once and exit.
    Status {
        /// Path to the configuration file.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bot_flags_parse() {
        let cli = Cli::try_parse_from(["nowplay", "bot", "--poll-timeout", "5", "--admin-id", "42"])
            .unwrap();
        match cli.command {
            Commands::Bot {
                poll_timeout,
                admin_id,
                config,
            } => {
                assert_eq!(poll_timeout, 5);
                assert_eq!(admin_id, Some(42));
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_PATH));
            }
            Commands::Status { .. } => panic!("expected bot"),
        }
    }
}
