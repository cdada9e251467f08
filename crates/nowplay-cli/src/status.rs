//! Subcommand: `nowplay status` -- print the current status once.

use std::path::Path;

use anyhow::Result;

use nowplay_core::{OverrideStore, StatusResolver};

use crate::config::load_bot_config;
use crate::helpers::{init_tracing, media_cli};

pub async fn cmd_status(config_path: &Path) -> Result<()> {
    init_tracing("warn");

    let config = load_bot_config(config_path);
    let media = media_cli(&config);
    let resolver = StatusResolver::new(OverrideStore::new(), media);

    let status = resolver.resolve().await;
    println!("{}", status.display_text);
    if let Some(artwork_id) = &status.artwork_id {
        println!();
        println!("  artwork: {artwork_id}");
    }
    Ok(())
}
