//! The status value announced to chats and the process-wide override.

use std::sync::{Arc, RwLock};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Where a [`Status`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Derived from the media source (what is playing right now).
    Media,
    /// Set by the operator with `/set`.
    Manual,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Media => write!(f, "media"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// One resolved snapshot of what the bot should display.
///
/// Equality is structural over all three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Text shown as the message body or photo caption.
    pub display_text: String,
    /// Opaque identifier of the current cover art, if any.
    pub artwork_id: Option<String>,
    /// Origin of this status.
    pub source: SourceKind,
}

impl Status {
    /// A status read from the media source.
    pub fn media(display_text: impl Into<String>, artwork_id: Option<String>) -> Self {
        Self {
            display_text: display_text.into(),
            artwork_id,
            source: SourceKind::Media,
        }
    }

    /// A status set manually. Manual statuses never carry artwork.
    pub fn manual(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            artwork_id: None,
            source: SourceKind::Manual,
        }
    }

    /// A media status describing why the media source could not be read.
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::media(format!("Failed to get currently playing media: {reason}"), None)
    }

    pub fn is_manual(&self) -> bool {
        self.source == SourceKind::Manual
    }
}

// ---------------------------------------------------------------------------
// Override
// ---------------------------------------------------------------------------

/// Process-wide manual status override (last write wins).
///
/// Cheaply cloneable; every session reads the same value.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl OverrideStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the override text.
    pub fn set(&self, text: impl Into<String>) {
        let text = text.into();
        match self.inner.write() {
            Ok(mut slot) => *slot = Some(text),
            Err(poisoned) => *poisoned.into_inner() = Some(text),
        }
    }

    /// Remove the override, returning the previous text if one was set.
    pub fn clear(&self) -> Option<String> {
        match self.inner.write() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Current override text, if any.
    pub fn get(&self) -> Option<String> {
        match self.inner.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.get().is_some()
    }
}
