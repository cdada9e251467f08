//! Supervised update-loop tasks, one per chat.
//!
//! Starting a session for a chat that already has one cancels the old loop
//! and waits for it to hand its session back before the new loop sends
//! anything, so at most one loop ever edits a chat's status.  The handle swap
//! is a single map insert, so this holds for concurrent starts too.
//!
//! Internally the registry is a [`DashMap`] keyed by chat id; it is cheaply
//! cloneable and `Send + Sync`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::Session;
use crate::traits::ChatId;
use crate::update_loop::UpdateLoop;

/// A running (or finished) loop task.
struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<Option<Session>>,
}

impl SessionHandle {
    /// Cancel the loop and wait for its session.
    async fn stop(self, chat_id: ChatId) -> Option<Session> {
        self.cancel.cancel();
        match self.task.await {
            Ok(session) => session,
            Err(e) => {
                warn!(chat_id, error = %e, "update loop task ended abnormally");
                None
            }
        }
    }
}

/// Registry of per-chat update loops.
#[derive(Clone)]
pub struct SessionRegistry {
    update_loop: Arc<UpdateLoop>,
    inner: Arc<DashMap<ChatId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(update_loop: Arc<UpdateLoop>) -> Self {
        Self {
            update_loop,
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn update_loop(&self) -> &Arc<UpdateLoop> {
        &self.update_loop
    }

    /// Start (or restart) the session for `chat_id`.
    pub fn start(&self, chat_id: ChatId) {
        self.spawn(chat_id, None);
    }

    /// Stop the session for `chat_id` and return its final state.
    pub async fn stop(&self, chat_id: ChatId) -> Option<Session> {
        let (_, handle) = self.inner.remove(&chat_id)?;
        handle.stop(chat_id).await
    }

    /// Bring back every session whose loop ended on a manual status.
    ///
    /// Each one gets a forced update showing the current status and then
    /// polls again.  Loops that are still polling are left alone; their next
    /// tick picks up the cleared override.  Returns the number of sessions
    /// resumed.
    pub async fn clear_all(&self) -> usize {
        let mut resumed = 0;
        for (chat_id, handle) in self.drain_finished() {
            let Some(session) = handle.stop(chat_id).await else {
                continue;
            };
            self.spawn(chat_id, Some(session));
            resumed += 1;
        }
        resumed
    }

    /// Cancel every loop and wait for all of them to exit.
    pub async fn shutdown(&self) {
        let handles = self.drain();
        info!(sessions = handles.len(), "shutting down update loops");
        for (chat_id, handle) in handles {
            handle.stop(chat_id).await;
        }
    }

    /// Whether a loop for `chat_id` is still polling.
    pub fn is_running(&self, chat_id: ChatId) -> bool {
        self.inner
            .get(&chat_id)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Number of registered sessions (running or terminal).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Spawn a loop for `chat_id`, either opening a new session or resuming
    /// `resume`, and register it in place of any previous loop.
    fn spawn(&self, chat_id: ChatId, resume: Option<Session>) {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let update_loop = Arc::clone(&self.update_loop);
        let (previous_tx, previous_rx) = oneshot::channel::<Option<SessionHandle>>();

        let task = tokio::spawn(async move {
            if let Ok(Some(previous)) = previous_rx.await {
                previous.stop(chat_id).await;
            }
            if token.is_cancelled() {
                return resume;
            }
            let session = match resume {
                Some(session) => update_loop.resume(session, token).await,
                None => update_loop.open(chat_id, token).await,
            };
            Some(update_loop.run(session).await)
        });

        // `insert` swaps under the shard lock, so concurrent starts for one
        // chat chain onto each other instead of dropping a handle.
        let previous = self.inner.insert(chat_id, SessionHandle { cancel, task });
        if let Some(previous) = &previous {
            info!(chat_id, "re-anchoring session, cancelling previous loop");
            previous.cancel.cancel();
        }
        // The new task is the only receiver and waits for this value first.
        let _ = previous_tx.send(previous);
    }

    fn drain_finished(&self) -> Vec<(ChatId, SessionHandle)> {
        let chat_ids: Vec<ChatId> = self
            .inner
            .iter()
            .filter(|entry| entry.task.is_finished())
            .map(|entry| *entry.key())
            .collect();
        chat_ids
            .into_iter()
            .filter_map(|chat_id| {
                self.inner
                    .remove_if(&chat_id, |_, handle| handle.task.is_finished())
            })
            .collect()
    }

    fn drain(&self) -> Vec<(ChatId, SessionHandle)> {
        let chat_ids: Vec<ChatId> = self.inner.iter().map(|entry| *entry.key()).collect();
        chat_ids
            .into_iter()
            .filter_map(|chat_id| self.inner.remove(&chat_id))
            .collect()
    }
}
