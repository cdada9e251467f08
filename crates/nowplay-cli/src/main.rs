//! CLI entry point for nowplay.
//!
//! This binary provides the `nowplay` command: `bot` runs the Telegram
//! gateway, `status` prints what would currently be announced.

mod bot;
mod cli;
mod config;
mod helpers;
mod status;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bot {
            poll_timeout,
            admin_id,
            config,
        } => bot::cmd_bot(poll_timeout, admin_id, &config).await,
        Commands::Status { config } => status::cmd_status(&config).await,
    }
}
