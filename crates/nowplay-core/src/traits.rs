//! Collaborator interfaces.
//!
//! The core never talks to the operating system or the network directly.
//! Media queries, artwork extraction, the chat transport, and text
//! generation are reached through the traits below; concrete
//! implementations live in the `nowplay-adapters` crate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::media::NowPlaying;

/// Telegram chat identifier.
pub type ChatId = i64;
/// Telegram message identifier (unique within a chat).
pub type MessageId = i64;
/// Telegram user identifier.
pub type UserId = i64;

/// Reports what is currently playing on the host.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Query the raw now-playing metadata.
    ///
    /// Fails with [`StatusError::SourceUnavailable`](crate::StatusError) when
    /// nothing can be read.
    async fn now_playing(&self) -> Result<NowPlaying>;
}

/// Turns an artwork identifier into an image file on local disk.
#[async_trait]
pub trait ArtworkStore: Send + Sync {
    /// Extract the artwork and return the path of a fully written file.
    async fn fetch(&self, artwork_id: &str) -> Result<PathBuf>;
}

/// The chat messaging API.
///
/// Every method either returns the identifier of the affected message or a
/// [`StatusError::TransportFailure`](crate::StatusError).
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId>;

    /// Upload a local image with a caption.
    async fn send_photo(&self, chat_id: ChatId, photo: &Path, caption: &str)
    -> Result<MessageId>;

    /// Send an image hosted at `url`.
    async fn send_photo_url(&self, chat_id: ChatId, url: &str) -> Result<MessageId>;

    /// Replace the image of an existing photo message.
    async fn edit_media(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        photo: &Path,
    ) -> Result<MessageId>;

    /// Replace the caption of an existing photo message.
    async fn edit_caption(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        caption: &str,
    ) -> Result<MessageId>;

    /// Replace the body of an existing text message.
    async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &str)
    -> Result<MessageId>;
}

/// External text-generation service used by `/chat`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Source of random pictures for `/cat`.
#[async_trait]
pub trait PhotoFeed: Send + Sync {
    async fn random_photo_url(&self) -> Result<String>;
}
