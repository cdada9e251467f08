//! Concrete collaborators for nowplay.
//!
//! - [`telegram`] -- Telegram Bot API transport and long-polling calls.
//! - [`nowplaying_cli`] -- media source and artwork store backed by the macOS
//!   `nowplaying-cli` binary.
//! - [`gemini`] -- Gemini text generation for `/chat`.
//! - [`cat_api`] -- The Cat API photo feed for `/cat`.

pub mod cat_api;
pub mod error;
pub mod gemini;
pub mod nowplaying_cli;
pub mod telegram;

pub use cat_api::CatApi;
pub use error::{AdapterError, Result};
pub use gemini::GeminiClient;
pub use nowplaying_cli::NowPlayingCli;
pub use telegram::{BotInfo, TelegramTransport};
