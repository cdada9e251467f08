//! Change detection and poll interval policy.

use std::time::Duration;

use crate::status::{SourceKind, Status};

/// Default interval while tracking media.
pub const DEFAULT_MEDIA_INTERVAL: Duration = Duration::from_secs(10);
/// Default interval once a manual status is showing.
pub const DEFAULT_MANUAL_INTERVAL: Duration = Duration::from_secs(60);

/// Decides when a new status has to be sent and how long to wait before the
/// next poll.
#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    media_interval: Duration,
    manual_interval: Duration,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_INTERVAL, DEFAULT_MANUAL_INTERVAL)
    }
}

impl ChangeDetector {
    pub fn new(media_interval: Duration, manual_interval: Duration) -> Self {
        Self {
            media_interval,
            manual_interval,
        }
    }

    /// Whether `current` differs from what was last announced in a way that
    /// warrants a network update.  Artwork is ignored for manual statuses.
    pub fn should_update(&self, previous: Option<&Status>, current: &Status) -> bool {
        let Some(previous) = previous else {
            return true;
        };
        if previous.source != current.source {
            return true;
        }
        match current.source {
            SourceKind::Media => {
                previous.display_text != current.display_text
                    || previous.artwork_id != current.artwork_id
            }
            SourceKind::Manual => previous.display_text != current.display_text,
        }
    }

    /// Delay before the next poll.
    pub fn next_interval(&self, current: &Status, override_active: bool) -> Duration {
        if override_active || current.is_manual() {
            self.manual_interval
        } else {
            self.media_interval
        }
    }

    pub fn media_interval(&self) -> Duration {
        self.media_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_status_always_updates() {
        let detector = ChangeDetector::default();
        assert!(detector.should_update(None, &Status::media("Song A", None)));
        assert!(detector.should_update(None, &Status::manual("Working")));
    }

    #[test]
    fn identical_statuses_do_not_update() {
        let detector = ChangeDetector::default();
        let statuses = [
            Status::media("Song A", None),
            Status::media("Song A", Some("art".into())),
            Status::manual("Working"),
            Status::unavailable("boom"),
        ];
        for status in &statuses {
            assert!(!detector.should_update(Some(status), &status.clone()));
        }
    }

    #[test]
    fn media_text_or_artwork_change_updates() {
        let detector = ChangeDetector::default();
        let prev = Status::media("Song A", Some("art-1".into()));
        assert!(detector.should_update(Some(&prev), &Status::media("Song B", Some("art-1".into()))));
        assert!(detector.should_update(Some(&prev), &Status::media("Song A", Some("art-2".into()))));
        assert!(detector.should_update(Some(&prev), &Status::media("Song A", None)));
    }

    #[test]
    fn source_switch_updates() {
        let detector = ChangeDetector::default();
        let prev = Status::media("Working", None);
        assert!(detector.should_update(Some(&prev), &Status::manual("Working")));
    }

    #[test]
    fn manual_ignores_artwork() {
        let detector = ChangeDetector::default();
        let mut prev = Status::manual("Working");
        prev.artwork_id = Some("stale".into());
        assert!(!detector.should_update(Some(&prev), &Status::manual("Working")));
        assert!(detector.should_update(Some(&prev), &Status::manual("DND")));
    }

    #[test]
    fn interval_policy() {
        let detector = ChangeDetector::default();
        assert_eq!(
            detector.next_interval(&Status::media("x", None), false),
            Duration::from_secs(10)
        );
        assert_eq!(
            detector.next_interval(&Status::manual("x"), true),
            Duration::from_secs(60)
        );
    }
}
