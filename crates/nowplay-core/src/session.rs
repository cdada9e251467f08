//! Per-chat session state and the single live message it maintains.
//!
//! A [`Session`] is owned by exactly one update loop.  It remembers which
//! message is being edited, what was last announced, and which image was
//! last shown, so that sessions for different chats never interfere.
//!
//! [`MessageSession`] performs the create/edit calls against the transport
//! with retry-with-backoff.  A photo update is two API calls (media, then
//! caption); they are retried together, and a failure between them leaves
//! the message briefly inconsistent until the next successful update.
//!
//! Each session carries the cancellation token of the loop that owns it, so
//! a stopped session abandons its retry backoff instead of sleeping it out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::status::Status;
use crate::traits::{ArtworkStore, ChatId, MessageId, MessagingTransport};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Kind of the live message; decides which edit calls apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Photo,
    Text,
}

/// The message a session keeps editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveMessage {
    pub id: MessageId,
    pub kind: MessageKind,
}

/// Artwork most recently shown by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownArtwork {
    pub id: Option<String>,
    pub path: PathBuf,
}

/// Where the update loop stands for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Still polling at `poll_interval`.
    Polling,
    /// A manual status was announced; no further polling.
    Terminal,
}

/// State of one chat's status report.
#[derive(Debug, Clone)]
pub struct Session {
    chat_id: ChatId,
    message: Option<LiveMessage>,
    last_announced: Option<Status>,
    last_sent_manual: Option<Status>,
    last_artwork: Option<ShownArtwork>,
    poll_interval: Duration,
    state: LoopState,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(chat_id: ChatId, poll_interval: Duration) -> Self {
        Self {
            chat_id,
            message: None,
            last_announced: None,
            last_sent_manual: None,
            last_artwork: None,
            poll_interval,
            state: LoopState::Polling,
            started_at: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }

    /// Hand the session to a loop that stops on `cancel`.
    pub fn bind(&mut self, cancel: CancellationToken) {
        self.cancel = cancel;
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn message(&self) -> Option<LiveMessage> {
        self.message
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.message.map(|m| m.id)
    }

    pub fn last_announced(&self) -> Option<&Status> {
        self.last_announced.as_ref()
    }

    pub fn last_sent_manual(&self) -> Option<&Status> {
        self.last_sent_manual.as_ref()
    }

    /// Path of the image most recently shown, if it still exists on disk.
    pub fn last_artwork_path(&self) -> Option<&Path> {
        self.last_artwork
            .as_ref()
            .map(|a| a.path.as_path())
            .filter(|p| p.is_file())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state == LoopState::Terminal
    }

    /// Stop polling: a manual status has been shown.
    pub fn mark_terminal(&mut self) {
        self.state = LoopState::Terminal;
    }

    /// Go back to polling after a terminal manual status was cleared.
    pub fn resume_polling(&mut self) {
        self.state = LoopState::Polling;
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Pick the image to show for `status`.
    ///
    /// Artwork is only extracted when the identifier differs from the one
    /// last shown.  If extraction fails the previously shown image is reused.
    /// Statuses without an artwork id get no image.
    pub async fn artwork_for(&self, status: &Status, store: &dyn ArtworkStore) -> Option<PathBuf> {
        let artwork_id = status.artwork_id.as_deref()?;

        if let Some(shown) = &self.last_artwork
            && shown.id.as_deref() == Some(artwork_id)
            && shown.path.is_file()
        {
            return Some(shown.path.clone());
        }

        match store.fetch(artwork_id).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(
                    chat_id = self.chat_id,
                    artwork_id,
                    error = %e,
                    "artwork extraction failed, reusing last image"
                );
                self.last_artwork_path().map(Path::to_path_buf)
            }
        }
    }

    /// Record a successful create/update.
    fn record(&mut self, message: LiveMessage, status: &Status, artwork: Option<&Path>) {
        self.message = Some(message);
        if let (MessageKind::Photo, Some(path)) = (message.kind, artwork) {
            self.last_artwork = Some(ShownArtwork {
                id: status.artwork_id.clone(),
                path: path.to_path_buf(),
            });
        }
        // Once media is back on screen the manual text must be sent again.
        self.last_sent_manual = status.is_manual().then(|| status.clone());
        self.last_announced = Some(status.clone());
    }
}

// ---------------------------------------------------------------------------
// Message operations
// ---------------------------------------------------------------------------

/// Creates and edits a session's live message through the transport.
#[derive(Clone)]
pub struct MessageSession {
    transport: Arc<dyn MessagingTransport>,
    retry: RetryPolicy,
}

impl MessageSession {
    pub fn new(transport: Arc<dyn MessagingTransport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &Arc<dyn MessagingTransport> {
        &self.transport
    }

    /// Send a new message for `status`: a photo with caption when artwork
    /// is available, plain text otherwise.
    pub async fn create(
        &self,
        session: &mut Session,
        status: &Status,
        artwork: Option<&Path>,
    ) -> Result<MessageId> {
        let chat_id = session.chat_id;
        let cancel = session.cancel.clone();
        let text = status.display_text.as_str();
        let transport = &self.transport;

        let message = match artwork {
            Some(photo) => {
                let id = self
                    .retry
                    .run("sendPhoto", &cancel, move || {
                        transport.send_photo(chat_id, photo, text)
                    })
                    .await?;
                LiveMessage {
                    id,
                    kind: MessageKind::Photo,
                }
            }
            None => {
                let id = self
                    .retry
                    .run("sendMessage", &cancel, move || transport.send_text(chat_id, text))
                    .await?;
                LiveMessage {
                    id,
                    kind: MessageKind::Text,
                }
            }
        };

        info!(
            chat_id,
            message_id = message.id,
            kind = ?message.kind,
            source = %status.source,
            "status message created"
        );
        session.record(message, status, artwork);
        Ok(message.id)
    }

    /// Edit the live message in place to show `status`.
    ///
    /// Photo messages get their image replaced (when `artwork` is given) and
    /// then their caption; text messages get their body replaced.  A text
    /// message cannot gain an image, so once artwork shows up a photo message
    /// is sent and becomes the live message.  Returns the live message id.
    pub async fn update(
        &self,
        session: &mut Session,
        message: LiveMessage,
        status: &Status,
        artwork: Option<&Path>,
    ) -> Result<MessageId> {
        let chat_id = session.chat_id;
        let cancel = session.cancel.clone();
        let text = status.display_text.as_str();
        let transport = &self.transport;

        match (message.kind, artwork) {
            (MessageKind::Text, Some(_)) => {
                info!(
                    chat_id,
                    message_id = message.id,
                    "artwork available, replacing text message with a photo"
                );
                return self.create(session, status, artwork).await;
            }
            (MessageKind::Photo, Some(photo)) => {
                self.retry
                    .run("editMessageMedia+Caption", &cancel, move || async move {
                        transport.edit_media(chat_id, message.id, photo).await?;
                        transport.edit_caption(chat_id, message.id, text).await
                    })
                    .await?;
            }
            (MessageKind::Photo, None) => {
                self.retry
                    .run("editMessageCaption", &cancel, move || {
                        transport.edit_caption(chat_id, message.id, text)
                    })
                    .await?;
            }
            (MessageKind::Text, None) => {
                self.retry
                    .run("editMessageText", &cancel, move || {
                        transport.edit_text(chat_id, message.id, text)
                    })
                    .await?;
            }
        }

        debug!(chat_id, message_id = message.id, "status message edited");
        session.record(message, status, artwork);
        Ok(message.id)
    }

    /// Create the live message if the session has none, edit it otherwise.
    pub async fn send_or_update(
        &self,
        session: &mut Session,
        status: &Status,
        artwork: Option<&Path>,
    ) -> Result<MessageId> {
        match session.message {
            Some(message) => self.update(session, message, status, artwork).await,
            None => self.create(session, status, artwork).await,
        }
    }
}
