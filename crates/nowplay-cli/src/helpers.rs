//! Shared helpers for the CLI subcommands.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use nowplay_adapters::NowPlayingCli;
use nowplay_core::UserId;

use crate::config::BotConfig;

/// Initialise the tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `default_level` is used.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Read an environment variable, treating an empty value as unset.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolve the admin user: CLI flag, then `NOWPLAY_ADMIN_ID`, then config.
pub fn resolve_admin(flag: Option<UserId>, config: &BotConfig) -> Option<UserId> {
    flag.or_else(|| {
        env_non_empty("NOWPLAY_ADMIN_ID").and_then(|v| match v.trim().parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = %v, "NOWPLAY_ADMIN_ID is not a number, ignoring");
                None
            }
        })
    })
    .or(config.admin_user_id)
}

/// Build the `nowplaying-cli` adapter from configuration.
pub fn media_cli(config: &BotConfig) -> Arc<NowPlayingCli> {
    Arc::new(
        NowPlayingCli::new(&config.nowplaying_cli, &config.artwork_dir)
            .with_timeout(config.command_timeout_secs),
    )
}
