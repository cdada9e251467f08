//! Bot configuration.
//!
//! Reads the `[bot]` section from `config/default.toml` and turns it into the
//! core's timing and retry settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use nowplay_core::{ChangeDetector, RetryPolicy, UserId};

// ---------------------------------------------------------------------------
// Bot configuration
// ---------------------------------------------------------------------------

/// Settings loaded from the `[bot]` section of the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// Poll interval while tracking media, in seconds.
    pub media_interval_secs: u64,
    /// Poll interval once a manual status is active, in seconds.
    pub manual_interval_secs: u64,
    /// Attempts per Telegram call, including the first.
    pub retry_attempts: u32,
    /// First backoff delay, in seconds; doubled after every failure.
    pub retry_base_secs: u64,
    /// Directory extracted artwork is written to.
    pub artwork_dir: PathBuf,
    /// Path or name of the `nowplaying-cli` binary.
    pub nowplaying_cli: String,
    /// Timeout for each `nowplaying-cli` invocation, in seconds.
    pub command_timeout_secs: u64,
    /// Gemini model used by `/chat`.
    pub gemini_model: String,
    /// User allowed to `/set` and `/clear`.
    pub admin_user_id: Option<UserId>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            media_interval_secs: 10,
            manual_interval_secs: 60,
            retry_attempts: 5,
            retry_base_secs: 2,
            artwork_dir: PathBuf::from("data/artwork"),
            nowplaying_cli: "nowplaying-cli".to_string(),
            command_timeout_secs: 10,
            gemini_model: "gemini-2.5-flash".to_string(),
            admin_user_id: None,
        }
    }
}

impl BotConfig {
    pub fn detector(&self) -> ChangeDetector {
        ChangeDetector::new(
            Duration::from_secs(self.media_interval_secs),
            Duration::from_secs(self.manual_interval_secs),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay: Duration::from_secs(self.retry_base_secs),
        }
    }
}

/// Load bot configuration from `path`.
///
/// Falls back to defaults if the file is missing or the `[bot]` section is
/// absent.
pub fn load_bot_config(path: &Path) -> BotConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_bot_config(&content),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "config file not read, using defaults");
            BotConfig::default()
        }
    }
}

/// Parse the `[bot]` section of a TOML document.
pub fn parse_bot_config(content: &str) -> BotConfig {
    let defaults = BotConfig::default();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "invalid config file, using defaults");
            return defaults;
        }
    };

    let bot = match table.get("bot") {
        Some(toml::Value::Table(b)) => b,
        _ => return defaults,
    };

    let secs = |key: &str, default: u64| {
        bot.get(key)
            .and_then(|v| v.as_integer())
            .map(|v| v.max(1) as u64)
            .unwrap_or(default)
    };
    let string = |key: &str, default: &str| {
        bot.get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    BotConfig {
        media_interval_secs: secs("media_interval_secs", defaults.media_interval_secs),
        manual_interval_secs: secs("manual_interval_secs", defaults.manual_interval_secs),
        retry_attempts: bot
            .get("retry_attempts")
            .and_then(|v| v.as_integer())
            .map(|v| v.clamp(1, 20) as u32)
            .unwrap_or(defaults.retry_attempts),
        retry_base_secs: secs("retry_base_secs", defaults.retry_base_secs),
        artwork_dir: bot
            .get("artwork_dir")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .unwrap_or(defaults.artwork_dir),
        nowplaying_cli: string("nowplaying_cli", &defaults.nowplaying_cli),
        command_timeout_secs: secs("command_timeout_secs", defaults.command_timeout_secs),
        gemini_model: string("gemini_model", &defaults.gemini_model),
        admin_user_id: bot.get("admin_user_id").and_then(|v| v.as_integer()),
    }
}
