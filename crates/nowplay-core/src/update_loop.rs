//! The per-session polling loop.
//!
//! # Loop lifecycle
//!
//! ```text
//! open ──> Polling(10s) ──tick──> Polling(10s)   (media keeps polling)
//!               │
//!               └── manual status announced ──> Terminal (loop exits)
//!
//! Terminal ──/clear──> resume: forced update ──> Polling(10s)
//!
//! cancel token fired at a poll or retry sleep ──> loop returns the session
//! ```
//!
//! Each tick resolves the current status, asks the [`ChangeDetector`]
//! whether it differs from what was last announced, and if so creates or
//! edits the live message.  Errors never leave the loop: they are logged at
//! the tick boundary and polling continues.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::detector::ChangeDetector;
use crate::error::{Result, StatusError};
use crate::resolver::StatusResolver;
use crate::session::{MessageSession, Session};
use crate::traits::{ArtworkStore, ChatId};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The live message was created or edited.
    Updated,
    /// Nothing changed since the last announcement.
    Unchanged,
    /// The manual status was already sent; no network call was made.
    ManualAlreadySent,
}

/// Drives sessions: resolve, detect, send, sleep.
pub struct UpdateLoop {
    resolver: Arc<StatusResolver>,
    detector: ChangeDetector,
    messages: MessageSession,
    artwork: Arc<dyn ArtworkStore>,
}

impl UpdateLoop {
    pub fn new(
        resolver: Arc<StatusResolver>,
        detector: ChangeDetector,
        messages: MessageSession,
        artwork: Arc<dyn ArtworkStore>,
    ) -> Self {
        Self {
            resolver,
            detector,
            messages,
            artwork,
        }
    }

    pub fn resolver(&self) -> &Arc<StatusResolver> {
        &self.resolver
    }

    pub fn messages(&self) -> &MessageSession {
        &self.messages
    }

    /// Start a session for `chat_id` that stops on `cancel`: the first tick
    /// always sends a new message.  A failed first send is logged; the next
    /// tick retries it.
    pub async fn open(&self, chat_id: ChatId, cancel: CancellationToken) -> Session {
        let mut session = Session::new(chat_id, self.detector.media_interval());
        session.bind(cancel);
        if let Err(e) = self.tick(&mut session).await {
            log_tick_error(chat_id, &e, "initial status message failed");
        }
        session
    }

    /// Bring a stopped session back under a new loop: force one update so
    /// the message shows the current status, then continue polling.
    pub async fn resume(&self, mut session: Session, cancel: CancellationToken) -> Session {
        session.bind(cancel);
        session.resume_polling();
        if let Err(e) = self.final_update(&mut session).await {
            log_tick_error(session.chat_id(), &e, "final status update failed");
        }
        session
    }

    /// Poll until the session's token is cancelled or the session turns
    /// terminal, then hand the session back.
    pub async fn run(&self, mut session: Session) -> Session {
        let chat_id = session.chat_id();
        let cancel = session.cancel_token().clone();
        info!(chat_id, "update loop started");

        loop {
            if session.is_terminal() {
                if self.resolver.overrides().is_active() {
                    info!(chat_id, "manual status announced, update loop finished");
                    return session;
                }
                // Cleared while the manual status was being sent.
                info!(chat_id, "override cleared during announcement, polling again");
                session.resume_polling();
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    let uptime = chrono::Utc::now() - session.started_at();
                    info!(chat_id, uptime_secs = uptime.num_seconds(), "update loop cancelled");
                    return session;
                }
                _ = tokio::time::sleep(session.poll_interval()) => {}
            }

            match self.tick(&mut session).await {
                Ok(outcome) => debug!(chat_id, ?outcome, "tick finished"),
                Err(e) => log_tick_error(chat_id, &e, "tick failed, continuing"),
            }
        }
    }

    /// One poll: resolve, compare, and send if needed.
    pub async fn tick(&self, session: &mut Session) -> Result<TickOutcome> {
        let status = self.resolver.resolve().await;
        let override_active = self.resolver.overrides().is_active();

        if override_active && session.last_sent_manual() == Some(&status) {
            session.set_poll_interval(self.detector.next_interval(&status, true));
            return Ok(TickOutcome::ManualAlreadySent);
        }

        if !self
            .detector
            .should_update(session.last_announced(), &status)
        {
            session.set_poll_interval(self.detector.next_interval(&status, override_active));
            return Ok(TickOutcome::Unchanged);
        }

        let artwork = session.artwork_for(&status, self.artwork.as_ref()).await;
        self.messages
            .send_or_update(session, &status, artwork.as_deref())
            .await?;

        session.set_poll_interval(self.detector.next_interval(&status, override_active));
        if status.is_manual() {
            session.mark_terminal();
        }
        Ok(TickOutcome::Updated)
    }

    /// Send the current status regardless of what was last announced.
    ///
    /// Used when the override is cleared so the message stops showing the
    /// manual text.
    pub async fn final_update(&self, session: &mut Session) -> Result<()> {
        let status = self.resolver.resolve().await;
        let override_active = self.resolver.overrides().is_active();
        let artwork = session.artwork_for(&status, self.artwork.as_ref()).await;
        self.messages
            .send_or_update(session, &status, artwork.as_deref())
            .await?;

        session.set_poll_interval(self.detector.next_interval(&status, override_active));
        if status.is_manual() {
            session.mark_terminal();
        }
        info!(
            chat_id = session.chat_id(),
            source = %status.source,
            "final status update sent"
        );
        Ok(())
    }
}

fn log_tick_error(chat_id: ChatId, error: &StatusError, message: &str) {
    if error.is_cancelled() {
        debug!(chat_id, error = %error, "{message}");
    } else {
        warn!(chat_id, error = %error, "{message}");
    }
}
