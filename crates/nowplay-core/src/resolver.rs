//! Merges the manual override with the media source into one [`Status`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::status::{OverrideStore, Status};
use crate::traits::MediaSource;

/// Produces the authoritative [`Status`] for a poll.
pub struct StatusResolver {
    overrides: OverrideStore,
    source: Arc<dyn MediaSource>,
}

impl StatusResolver {
    pub fn new(overrides: OverrideStore, source: Arc<dyn MediaSource>) -> Self {
        Self { overrides, source }
    }

    /// The override store this resolver reads.
    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    /// Resolve the current status.
    ///
    /// An active override wins without touching the media source.  Media
    /// failures are folded into the returned status text; this never fails.
    pub async fn resolve(&self) -> Status {
        if let Some(text) = self.overrides.get() {
            debug!("override active, skipping media query");
            return Status::manual(text);
        }

        match self.source.now_playing().await {
            Ok(now_playing) => now_playing.to_status(),
            Err(e) => {
                warn!(error = %e, "media source query failed");
                Status::unavailable(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{Result, StatusError};
    use crate::media::{NowPlaying, keys};
    use crate::status::SourceKind;

    struct CountingSource {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl MediaSource for CountingSource {
        async fn now_playing(&self) -> Result<NowPlaying> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StatusError::source_unavailable("nowplaying-cli exited with 1"))
            } else {
                Ok(NowPlaying::from_pairs([(keys::TITLE, "Song A")]))
            }
        }
    }

    fn resolver(fail: bool) -> (StatusResolver, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            calls: AtomicU32::new(0),
            fail,
        });
        (
            StatusResolver::new(OverrideStore::new(), source.clone()),
            source,
        )
    }

    #[tokio::test]
    async fn media_status_without_override() {
        let (resolver, source) = resolver(false);
        let status = resolver.resolve().await;
        assert_eq!(status.source, SourceKind::Media);
        assert!(status.display_text.contains("Song A"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn override_skips_media_source() {
        let (resolver, source) = resolver(false);
        resolver.overrides().set("Working");

        let status = resolver.resolve().await;
        assert_eq!(status, Status::manual("Working"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cleared_override_returns_to_media() {
        let (resolver, _) = resolver(false);
        resolver.overrides().set("Working");
        resolver.overrides().clear();

        assert_eq!(resolver.resolve().await.source, SourceKind::Media);
    }

    #[tokio::test]
    async fn source_failure_is_encoded_in_status() {
        let (resolver, _) = resolver(true);
        let status = resolver.resolve().await;
        assert_eq!(status.source, SourceKind::Media);
        assert!(status.artwork_id.is_none());
        assert!(
            status
                .display_text
                .starts_with("Failed to get currently playing media")
        );
    }
}
