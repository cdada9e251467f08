//! Normalization of raw now-playing metadata into display text.
//!
//! Media sources hand back loosely formatted key/value pairs (values may be
//! quoted and may carry a trailing `;`-separated segment).  [`NowPlaying`]
//! cleans those values and renders the caption shown in chat:
//!
//! ```text
//! ▶️ Title - Album
//! 🎤 Artist
//! ⏳00:01:05 / 00:03:30
//!
//! ≣≣≣≣≣≣⋯⋯⋯⋯⋯⋯⋯⋯⋯⋯⋯⋯⋯⋯ (30.95%)
//! ```

use std::collections::HashMap;

use crate::status::Status;

/// Metadata keys understood by the renderer.
pub mod keys {
    pub const TITLE: &str = "kMRMediaRemoteNowPlayingInfoTitle";
    pub const ALBUM: &str = "kMRMediaRemoteNowPlayingInfoAlbum";
    pub const ARTIST: &str = "kMRMediaRemoteNowPlayingInfoArtist";
    pub const DURATION: &str = "kMRMediaRemoteNowPlayingInfoDuration";
    pub const ELAPSED_TIME: &str = "kMRMediaRemoteNowPlayingInfoElapsedTime";
    pub const PLAYBACK_RATE: &str = "kMRMediaRemoteNowPlayingInfoPlaybackRate";
    pub const ARTWORK_IDENTIFIER: &str = "kMRMediaRemoteNowPlayingInfoArtworkIdentifier";
}

const DEFAULT_TITLE: &str = "Something... IDK";
const DEFAULT_ALBUM: &str = " ";
const DEFAULT_ARTIST: &str = "Unknown Artist";

const PLAYING_ICON: &str = "▶️";
const PAUSED_ICON: &str = "⏸️";

/// Number of cells in the text progress bar.
const PROGRESS_BAR_CELLS: usize = 20;
const PROGRESS_FILLED: char = '≣';
const PROGRESS_EMPTY: char = '⋯';

/// Raw now-playing metadata as reported by a media source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    fields: HashMap<String, String>,
}

impl NowPlaying {
    /// Build from already split key/value pairs.  Keys and values are
    /// trimmed; surrounding quotes on values are removed.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| {
                (
                    k.as_ref().trim().to_string(),
                    v.as_ref().trim().trim_matches('"').to_string(),
                )
            })
            .collect();
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The cleaned value for `key`: everything before the first `;` with all
    /// double quotes removed.
    pub fn field(&self, key: &str) -> Option<String> {
        self.fields.get(key).map(|raw| clean_value(raw))
    }

    fn field_or(&self, key: &str, default: &str) -> String {
        self.field(key).unwrap_or_else(|| default.to_string())
    }

    /// Whether the player reports a playback rate of exactly `1`.
    pub fn is_playing(&self) -> bool {
        self.field(keys::PLAYBACK_RATE).as_deref() == Some("1")
    }

    /// Identifier of the current artwork, if the player reports one.
    pub fn artwork_id(&self) -> Option<String> {
        self.field(keys::ARTWORK_IDENTIFIER)
            .filter(|id| !id.is_empty() && id != "(null)")
    }

    /// Render the caption text for this metadata.
    pub fn render(&self) -> String {
        let icon = if self.is_playing() {
            PLAYING_ICON
        } else {
            PAUSED_ICON
        };
        let title = self.field_or(keys::TITLE, DEFAULT_TITLE);
        let album = self.field_or(keys::ALBUM, DEFAULT_ALBUM);
        let artist = self.field_or(keys::ARTIST, DEFAULT_ARTIST);

        // Both times fall back to zero if either fails to parse.
        let (duration, elapsed) = match (
            self.field_or(keys::DURATION, "0").parse::<f64>(),
            self.field_or(keys::ELAPSED_TIME, "0").parse::<f64>(),
        ) {
            (Ok(d), Ok(e)) => (d, e),
            _ => (0.0, 0.0),
        };

        let elapsed_str = if elapsed == 0.0 {
            String::new()
        } else {
            format_hms(elapsed)
        };
        let progress = if duration > 0.0 {
            elapsed / duration * 100.0
        } else {
            0.0
        };

        format!(
            "{icon} {title} - {album}\n🎤 {artist}\n⏳{elapsed_str} / {} \n\n{} ({progress:.2}%)",
            format_hms(duration),
            progress_bar(progress),
        )
    }

    /// Convert into a media [`Status`].
    pub fn to_status(&self) -> Status {
        Status::media(self.render(), self.artwork_id())
    }
}

fn clean_value(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().replace('"', "")
}

/// Format seconds as zero-padded `hh:mm:ss`.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Render a fixed-width bar for a percentage in `0..=100`.
pub fn progress_bar(percent: f64) -> String {
    let filled = if percent.is_finite() && percent > 0.0 {
        ((PROGRESS_BAR_CELLS as f64 * percent / 100.0).floor() as usize).min(PROGRESS_BAR_CELLS)
    } else {
        0
    };
    let mut bar = String::with_capacity(PROGRESS_BAR_CELLS * 3);
    bar.extend(std::iter::repeat_n(PROGRESS_FILLED, filled));
    bar.extend(std::iter::repeat_n(PROGRESS_EMPTY, PROGRESS_BAR_CELLS - filled));
    bar
}
