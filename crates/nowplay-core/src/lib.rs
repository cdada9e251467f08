//! nowplay core.
//!
//! Keeps one live chat message per session in sync with what is playing on
//! the host, or with a manual status set by the operator:
//!
//! - **[`resolver`]** -- Turns the override store and the media source into a
//!   single [`Status`] per poll.
//! - **[`detector`]** -- Decides when a status warrants a network edit and how
//!   long to sleep before the next poll.
//! - **[`session`]** -- Per-chat session state and the create/update calls on
//!   the live message, retried with [`retry::RetryPolicy`].
//! - **[`update_loop`]** -- The polling loop driving a session.
//! - **[`registry`]** -- Supervised loop tasks, at most one per chat.
//! - **[`commands`]** -- Command parsing and routing.
//!
//! Everything that touches the network or the operating system sits behind
//! the traits in [`traits`].

pub mod commands;
pub mod detector;
pub mod error;
pub mod media;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod status;
pub mod traits;
pub mod update_loop;

pub use commands::{Command, CommandRouter, Inbound, Reply, parse_command};
pub use detector::ChangeDetector;
pub use error::{Result, StatusError};
pub use media::NowPlaying;
pub use registry::SessionRegistry;
pub use resolver::StatusResolver;
pub use retry::RetryPolicy;
pub use session::{LiveMessage, LoopState, MessageKind, MessageSession, Session};
pub use status::{OverrideStore, SourceKind, Status};
pub use traits::{
    ArtworkStore, ChatId, MediaSource, MessageId, MessagingTransport, PhotoFeed, TextGenerator,
    UserId,
};
pub use update_loop::{TickOutcome, UpdateLoop};
