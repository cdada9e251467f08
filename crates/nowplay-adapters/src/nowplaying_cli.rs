//! macOS `nowplaying-cli` media source and artwork store.
//!
//! `nowplaying-cli get-raw` prints the MediaRemote dictionary as
//! `key = value;` lines.  `nowplaying-cli get artworkData` prints the cover
//! image as base64, which is decoded and written into the artwork directory.
//!
//! Artwork files are written to a temporary file in the same directory and
//! renamed into place, so a path handed to the core always names a complete
//! image.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use nowplay_core::{ArtworkStore, MediaSource, NowPlaying};

use crate::error::{AdapterError, Result};

/// Default command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Number of artwork files kept in the artwork directory.
const ARTWORK_KEEP: usize = 16;

/// Prefix of artwork files written by this store.
const ARTWORK_PREFIX: &str = "artwork-";

/// Wrapper around the `nowplaying-cli` binary.
#[derive(Debug, Clone)]
pub struct NowPlayingCli {
    program: String,
    artwork_dir: PathBuf,
    timeout: Duration,
}

impl NowPlayingCli {
    pub fn new(program: impl Into<String>, artwork_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            artwork_dir: artwork_dir.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the per-invocation timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    pub fn artwork_dir(&self) -> &Path {
        &self.artwork_dir
    }

    /// Run the binary with `args` and return its stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(command = %command, "running media command");

        let child = tokio::process::Command::new(&self.program)
            .args(args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AdapterError::CommandFailed {
                command: command.clone(),
                reason: format!("failed to spawn process: {e}"),
            })?;

        // On timeout the child is dropped and killed via `kill_on_drop(true)`.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(AdapterError::CommandFailed {
                    command,
                    reason: format!("process error: {e}"),
                });
            }
            Err(_) => {
                warn!(command = %command, timeout = ?self.timeout, "media command timed out");
                return Err(AdapterError::Timeout {
                    seconds: self.timeout.as_secs(),
                    reason: format!("`{command}` exceeded time limit"),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdapterError::CommandFailed {
                command,
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Read the current cover image and store it under the artwork directory.
    pub async fn extract_artwork(&self, artwork_id: &str) -> Result<PathBuf> {
        let encoded = self.run(&["get", "artworkData"]).await?;
        let bytes = decode_artwork(&encoded)?;
        let extension = sniff_image_extension(&bytes)
            .ok_or_else(|| AdapterError::invalid_response("nowplaying-cli", "unrecognized image data"))?;

        let dir = self.artwork_dir.clone();
        let file_name = format!("{ARTWORK_PREFIX}{}.{extension}", sanitize_file_stem(artwork_id));
        let path = tokio::task::spawn_blocking(move || {
            let path = write_atomically(&dir, &file_name, &bytes)?;
            prune_artwork(&dir, ARTWORK_KEEP);
            Ok::<_, std::io::Error>(path)
        })
        .await
        .map_err(|e| AdapterError::Io(std::io::Error::other(e)))??;

        info!(artwork_id, path = %path.display(), "artwork extracted");
        Ok(path)
    }
}

#[async_trait]
impl MediaSource for NowPlayingCli {
    async fn now_playing(&self) -> nowplay_core::Result<NowPlaying> {
        let output = self.run(&["get-raw"]).await.map_err(AdapterError::into_source)?;
        Ok(parse_raw(&output))
    }
}

#[async_trait]
impl ArtworkStore for NowPlayingCli {
    async fn fetch(&self, artwork_id: &str) -> nowplay_core::Result<PathBuf> {
        self.extract_artwork(artwork_id)
            .await
            .map_err(AdapterError::into_source)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse `get-raw` output: every line containing ` = ` is a key/value pair.
pub fn parse_raw(output: &str) -> NowPlaying {
    NowPlaying::from_pairs(
        output
            .lines()
            .filter_map(|line| line.split_once(" = "))
            .map(|(key, value)| (key.trim(), value.trim())),
    )
}

/// Decode the base64 artwork payload, ignoring embedded whitespace.
pub fn decode_artwork(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.split_whitespace().collect();
    if compact.is_empty() || compact == "null" {
        return Err(AdapterError::invalid_response(
            "nowplaying-cli",
            "no artwork data",
        ));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AdapterError::invalid_response("nowplaying-cli", format!("bad base64: {e}")))
}

/// File extension for the image format recognised from magic bytes.
pub fn sniff_image_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Turn an artwork identifier into a safe file stem.
pub fn sanitize_file_stem(artwork_id: &str) -> String {
    let stem: String = artwork_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(64)
        .collect();
    if stem.is_empty() {
        "unknown".to_string()
    } else {
        stem
    }
}

/// Write `bytes` to `dir/file_name` through a temp file and an atomic rename.
fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    let target = dir.join(file_name);
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}

/// Delete all but the `keep` most recently modified artwork files.
fn prune_artwork(dir: &Path, keep: usize) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut files: Vec<(std::time::SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(ARTWORK_PREFIX))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, entry.path()))
        })
        .collect();
    if files.len() <= keep {
        return;
    }

    files.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in files.into_iter().skip(keep) {
        if let Err(e) = std::fs::remove_file(&path) {
            debug!(path = %path.display(), error = %e, "failed to prune artwork");
        }
    }
}

#[cfg(test)]
mod tests {
    use nowplay_core::media::keys;

    use super::*;

    const RAW: &str = r#"{
    kMRMediaRemoteNowPlayingInfoAlbum = "Kind of Blue";
    kMRMediaRemoteNowPlayingInfoArtist = "Miles Davis";
    kMRMediaRemoteNowPlayingInfoArtworkIdentifier = 9f8e7d6c;
    kMRMediaRemoteNowPlayingInfoDuration = "545.2";
    kMRMediaRemoteNowPlayingInfoElapsedTime = "65";
    kMRMediaRemoteNowPlayingInfoPlaybackRate = 1;
    kMRMediaRemoteNowPlayingInfoTitle = "So What";
}"#;

    #[test]
    fn parse_raw_reads_media_remote_dictionary() {
        let np = parse_raw(RAW);
        assert_eq!(np.field(keys::TITLE).as_deref(), Some("So What"));
        assert_eq!(np.field(keys::ARTIST).as_deref(), Some("Miles Davis"));
        assert_eq!(np.artwork_id().as_deref(), Some("9f8e7d6c"));
        assert!(np.is_playing());
        assert!(np.render().starts_with("▶️ So What - Kind of Blue\n🎤 Miles Davis"));
    }

    #[test]
    fn parse_raw_of_empty_output_uses_defaults() {
        let np = parse_raw("");
        assert!(np.is_empty());
        assert!(np.render().contains("Something... IDK"));
    }

    #[test]
    fn decode_rejects_missing_artwork() {
        assert!(decode_artwork("  \n").is_err());
        assert!(decode_artwork("null\n").is_err());
        assert!(decode_artwork("not base64 !!").is_err());
    }

    #[test]
    fn decode_ignores_line_breaks() {
        let encoded = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        let (a, b) = encoded.split_at(4);
        let bytes = decode_artwork(&format!("{a}\n{b}\n")).unwrap();
        assert_eq!(sniff_image_extension(&bytes), Some("jpg"));
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_image_extension(b"\x89PNG\r\n\x1a\nrest"), Some("png"));
        assert_eq!(sniff_image_extension(b"GIF89a"), Some("gif"));
        assert_eq!(sniff_image_extension(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
        assert_eq!(sniff_image_extension(b"hello"), None);
    }

    #[test]
    fn sanitizes_identifiers() {
        assert_eq!(sanitize_file_stem("ab/../cd"), "ab____cd");
        assert_eq!(sanitize_file_stem(""), "unknown");
        assert_eq!(sanitize_file_stem(&"x".repeat(100)).len(), 64);
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_atomically(dir.path(), "artwork-a.jpg", b"one").unwrap();
        let second = write_atomically(dir.path(), "artwork-a.jpg", b"two").unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        // No temp files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn prune_keeps_newest_artwork_only() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write_atomically(dir.path(), &format!("artwork-{i}.jpg"), b"x").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        prune_artwork(dir.path(), 2);

        let remaining = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(ARTWORK_PREFIX))
            .count();
        assert_eq!(remaining, 2);
        assert!(dir.path().join("notes.txt").exists());
    }
}
