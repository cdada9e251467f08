//! Subcommand: `nowplay bot` -- Telegram bot gateway.
//!
//! Long-polls Telegram for incoming messages and hands each one to the
//! [`CommandRouter`] in order.  Status sessions run as supervised tasks in the
//! [`SessionRegistry`]; Ctrl+C stops the gateway and cancels every session.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use nowplay_adapters::{CatApi, GeminiClient, TelegramTransport};
use nowplay_core::{
    CommandRouter, Inbound, MessageSession, OverrideStore, SessionRegistry, StatusResolver,
    UpdateLoop, UserId,
};

use crate::config::load_bot_config;
use crate::helpers::{env_non_empty, init_tracing, media_cli, resolve_admin};

/// Run the Telegram bot gateway.
pub async fn cmd_bot(poll_timeout: u64, admin_id: Option<UserId>, config_path: &Path) -> Result<()> {
    init_tracing("info");
    info!("starting Telegram bot gateway");

    let bot_token = env_non_empty("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
        anyhow::anyhow!("TELEGRAM_BOT_TOKEN is required. Create a bot at https://t.me/BotFather")
    })?;

    let transport = Arc::new(TelegramTransport::new(bot_token));

    // Verify the token by calling getMe.
    let me = transport
        .get_me()
        .await
        .context("Telegram getMe failed, check TELEGRAM_BOT_TOKEN")?;
    let bot_name = me.username.unwrap_or_else(|| "unknown".to_string());

    let config = load_bot_config(config_path);
    let admin = resolve_admin(admin_id, &config);
    if admin.is_none() {
        warn!("no admin configured, /set and /clear are disabled");
    }

    // Core wiring.
    let media = media_cli(&config);
    let overrides = OverrideStore::new();
    let resolver = Arc::new(StatusResolver::new(overrides, media.clone()));
    let messages = MessageSession::new(transport.clone(), config.retry_policy());
    let update_loop = Arc::new(UpdateLoop::new(
        resolver,
        config.detector(),
        messages,
        media,
    ));
    let registry = SessionRegistry::new(update_loop);

    let mut router = CommandRouter::new(registry.clone(), transport.clone())
        .with_admin(admin)
        .with_photo_feed(Arc::new(CatApi::new()));
    let chat_status = match env_non_empty("GEMINI_API_KEY") {
        Some(key) => {
            let gemini = GeminiClient::new(key).with_model(&config.gemini_model);
            router = router.with_text_generator(Arc::new(gemini));
            config.gemini_model.as_str()
        }
        None => "disabled (set GEMINI_API_KEY to enable)",
    };
    let router = Arc::new(router);

    // Print banner.
    println!();
    println!("  nowplay Telegram gateway v{}", env!("CARGO_PKG_VERSION"));
    println!("  Bot: @{bot_name}");
    match admin {
        Some(id) => println!("  Admin: {id}"),
        None => println!("  Admin: none"),
    }
    println!("  Chat: {chat_status}");
    println!(
        "  Poll intervals: {}s media / {}s manual",
        config.media_interval_secs, config.manual_interval_secs
    );
    println!("  Long-poll timeout: {poll_timeout}s");
    println!();
    println!("  Bot is running. Send /activity to @{bot_name} on Telegram.");
    println!("  Press Ctrl+C to stop.");
    println!();

    let mut offset: i64 = 0;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let updates = tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("shutdown requested");
                break;
            }
            updates = transport.get_updates(offset, poll_timeout) => updates,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Telegram poll failed, retrying...");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let (Some(text), Some(from)) = (message.text, message.from) else {
                continue;
            };

            let inbound = Inbound {
                chat_id: message.chat.id,
                user_id: from.id,
                text,
            };
            info!(
                chat_id = inbound.chat_id,
                user_id = inbound.user_id,
                user_name = %from.first_name,
                text = %inbound.text,
                "incoming Telegram message"
            );

            router.route(inbound).await;
        }
    }

    registry.shutdown().await;
    info!("bot gateway stopped");
    Ok(())
}
