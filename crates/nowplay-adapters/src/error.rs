//! Adapter error types.
//!
//! All adapters surface errors through [`AdapterError`].  At the boundary to
//! the core each error is converted into a
//! [`StatusError`](nowplay_core::StatusError): transport adapters produce
//! retryable transport failures, everything else degrades to
//! `SourceUnavailable`.

use nowplay_core::StatusError;

/// Unified error type for nowplay adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An I/O operation failed within the adapter.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request could not be completed.
    #[error("request to `{service}` failed: {reason}")]
    Http { service: String, reason: String },

    /// The Telegram Bot API answered with `ok: false`.
    #[error("Telegram API error in `{method}` (code {code}): {description}")]
    Telegram {
        method: String,
        code: i64,
        description: String,
    },

    /// A response arrived but did not have the expected shape.
    #[error("unexpected response from `{service}`: {reason}")]
    InvalidResponse { service: String, reason: String },

    /// An external command exited unsuccessfully.
    #[error("command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// An operation exceeded its time limit.
    #[error("timeout after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    pub(crate) fn http(service: &str, e: impl std::fmt::Display) -> Self {
        Self::Http {
            service: service.to_string(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn invalid_response(service: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.to_string(),
            reason: reason.into(),
        }
    }

    /// Convert into a core transport failure for `operation`.
    pub fn into_transport(self, operation: &str) -> StatusError {
        StatusError::transport(operation, self)
    }

    /// Convert into a core source failure.
    pub fn into_source(self) -> StatusError {
        StatusError::source_unavailable(self)
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
