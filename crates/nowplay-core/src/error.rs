//! Core error types.
//!
//! Every fallible operation in this crate returns [`StatusError`].  The
//! variants mirror how the failure is handled: a source failure degrades the
//! displayed status, a transport failure is retried, and the command-level
//! variants are turned into chat replies.

/// Unified error type for the status-tracking core.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    // -- Collaborator errors ------------------------------------------------
    /// The media source or the artwork store could not produce a result.
    #[error("source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// A call to the messaging API failed.
    #[error("transport failure during `{operation}`: {reason}")]
    TransportFailure { operation: String, reason: String },

    /// A transport operation kept failing until the retry budget ran out.
    #[error("`{operation}` failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        reason: String,
    },

    /// The session was stopped while the operation waited to retry.
    #[error("`{operation}` cancelled")]
    Cancelled { operation: String },

    // -- Command errors -----------------------------------------------------
    /// A privileged command was sent by someone other than the admin.
    #[error("user {user_id} is not authorized to run /{command}")]
    Unauthorized { user_id: i64, command: String },

    /// A command was missing a required argument.
    #[error("malformed input: {usage}")]
    MalformedInput { usage: String },

    // -- Generic ------------------------------------------------------------
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StatusError {
    /// Shorthand for a [`StatusError::SourceUnavailable`].
    pub fn source_unavailable(reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a [`StatusError::TransportFailure`].
    pub fn transport(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::TransportFailure {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the retry policy should try the operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The text shown to a chat user when a command fails with this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => {
                "Sorry, you are not authorized to change the activity.".to_string()
            }
            Self::MalformedInput { usage } => format!("Usage: {usage}"),
            Self::SourceUnavailable { .. } => {
                "That service is unavailable right now, try again later.".to_string()
            }
            Self::TransportFailure { .. } | Self::RetriesExhausted { .. } => {
                "Could not reach Telegram, try again later.".to_string()
            }
            Self::Cancelled { .. } => "The request was cancelled.".to_string(),
            Self::Config(reason) => format!("The bot is misconfigured: {reason}"),
        }
    }
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, StatusError>;
