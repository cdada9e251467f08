//! Inbound chat commands.
//!
//! The gateway hands every incoming text message to [`CommandRouter::route`],
//! one at a time.  Commands that change the override or the registry finish
//! before the next message is looked at, so they apply in arrival order;
//! only the slow `/chat` and `/cat` replies run on their own tasks.
//!
//! Commands only touch the override store and the session registry; the live
//! status message itself is always written by the update loops.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Result, StatusError};
use crate::registry::SessionRegistry;
use crate::status::OverrideStore;
use crate::traits::{ChatId, MessagingTransport, PhotoFeed, TextGenerator, UserId};

/// Reply to `/start`.
pub const HELP_TEXT: &str = "Hello! I keep a live \"now playing\" message in this chat.\n\n\
/activity - show what is playing and keep it updated\n\
/set <text> - show a manual status instead (admin only)\n\
/clear - go back to the media status (admin only)\n\
/chat <message> - ask the AI\n\
/cat - a random cat picture";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Activity,
    /// `/set <text>`; the text is empty when the argument is missing.
    Set(String),
    Clear,
    /// `/chat <message>`; empty when the argument is missing.
    Chat(String),
    Cat,
    Unknown(String),
}

impl Command {
    /// Whether the command only produces a reply from an outside service and
    /// can run without holding up the messages after it.
    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Chat(_) | Self::Cat)
    }
}

/// Parse a message text into a command.
///
/// Returns `None` for plain (non-command) messages.  A `@botname` suffix on
/// the command word is ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let (word, arg) = match rest.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (rest, ""),
    };
    let name = word.split('@').next().unwrap_or(word).to_lowercase();

    let command = match name.as_str() {
        "start" | "help" => Command::Start,
        "activity" => Command::Activity,
        "set" => Command::Set(arg.to_string()),
        "clear" => Command::Clear,
        "chat" => Command::Chat(arg.to_string()),
        "cat" => Command::Cat,
        _ => Command::Unknown(name),
    };
    Some(command)
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// An incoming chat message.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

/// What the router wants sent back to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// A photo hosted at the given URL.
    Photo(String),
    /// Nothing to send (the update loop posts its own message).
    None,
}

/// Dispatches commands to the override store, the session registry and the
/// optional chat services.
pub struct CommandRouter {
    overrides: OverrideStore,
    registry: SessionRegistry,
    transport: Arc<dyn MessagingTransport>,
    text_generator: Option<Arc<dyn TextGenerator>>,
    photo_feed: Option<Arc<dyn PhotoFeed>>,
    admin: Option<UserId>,
}

impl CommandRouter {
    /// Create a router with no admin and no chat services.
    pub fn new(registry: SessionRegistry, transport: Arc<dyn MessagingTransport>) -> Self {
        let overrides = registry.update_loop().resolver().overrides().clone();
        Self {
            overrides,
            registry,
            transport,
            text_generator: None,
            photo_feed: None,
            admin: None,
        }
    }

    /// The only user allowed to `/set` and `/clear`.
    pub fn with_admin(mut self, admin: Option<UserId>) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.text_generator = Some(generator);
        self
    }

    pub fn with_photo_feed(mut self, feed: Arc<dyn PhotoFeed>) -> Self {
        self.photo_feed = Some(feed);
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Handle one message in arrival order.
    ///
    /// State-changing commands are awaited here; `/chat` and `/cat` are
    /// spawned so a slow service never delays the commands behind them.
    pub async fn route(self: &Arc<Self>, inbound: Inbound) {
        let detached = parse_command(&inbound.text).is_some_and(|c| c.is_detached());
        if detached {
            let router = Arc::clone(self);
            tokio::spawn(async move {
                router.dispatch(&inbound).await;
            });
        } else {
            self.dispatch(&inbound).await;
        }
    }

    /// Handle one message and send the reply.  Failures become chat replies;
    /// a failed reply is only logged.
    pub async fn dispatch(&self, inbound: &Inbound) {
        let reply = match self.handle(inbound).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    chat_id = inbound.chat_id,
                    user_id = inbound.user_id,
                    error = %e,
                    "command rejected"
                );
                Reply::Text(e.user_message())
            }
        };

        let sent = match &reply {
            Reply::Text(text) => self.transport.send_text(inbound.chat_id, text).await,
            Reply::Photo(url) => self.transport.send_photo_url(inbound.chat_id, url).await,
            Reply::None => return,
        };
        if let Err(e) = sent {
            warn!(chat_id = inbound.chat_id, error = %e, "failed to send command reply");
        }
    }

    /// Apply the command's effects and decide the reply.
    pub async fn handle(&self, inbound: &Inbound) -> Result<Reply> {
        let Some(command) = parse_command(&inbound.text) else {
            return Ok(Reply::None);
        };

        match command {
            Command::Start => Ok(Reply::Text(HELP_TEXT.to_string())),

            Command::Activity => {
                info!(chat_id = inbound.chat_id, "starting status session");
                self.registry.start(inbound.chat_id);
                Ok(Reply::None)
            }

            Command::Set(text) => {
                self.authorize(inbound.user_id, "set")?;
                if text.is_empty() {
                    return Err(StatusError::MalformedInput {
                        usage: "/set <text>".into(),
                    });
                }
                self.overrides.set(text.clone());
                info!(user_id = inbound.user_id, activity = %text, "manual activity set");
                Ok(Reply::Text(format!("Activity set to: {text}")))
            }

            Command::Clear => {
                self.authorize(inbound.user_id, "clear")?;
                self.overrides.clear();
                info!(
                    user_id = inbound.user_id,
                    sessions = self.registry.len(),
                    "manual activity cleared"
                );
                let registry = self.registry.clone();
                tokio::spawn(async move {
                    let resumed = registry.clear_all().await;
                    info!(resumed, "manual sessions resumed after clear");
                });
                Ok(Reply::Text("Activity cleared.".into()))
            }

            Command::Chat(prompt) => {
                let Some(generator) = &self.text_generator else {
                    return Ok(Reply::Text("Chat is not configured on this bot.".into()));
                };
                if prompt.is_empty() {
                    return Err(StatusError::MalformedInput {
                        usage: "/chat <message>".into(),
                    });
                }
                match generator.generate(&prompt).await {
                    Ok(text) => Ok(Reply::Text(text)),
                    Err(e) => {
                        warn!(chat_id = inbound.chat_id, error = %e, "text generation failed");
                        Ok(Reply::Text(
                            "Failed to get a response from the text generator.".into(),
                        ))
                    }
                }
            }

            Command::Cat => {
                let Some(feed) = &self.photo_feed else {
                    return Ok(Reply::Text("No cats available right now.".into()));
                };
                match feed.random_photo_url().await {
                    Ok(url) => Ok(Reply::Photo(url)),
                    Err(e) => {
                        warn!(chat_id = inbound.chat_id, error = %e, "cat feed failed");
                        Ok(Reply::Text("Failed to fetch a cat picture.".into()))
                    }
                }
            }

            Command::Unknown(name) => {
                info!(chat_id = inbound.chat_id, command = %name, "ignoring unknown command");
                Ok(Reply::None)
            }
        }
    }

    fn authorize(&self, user_id: UserId, command: &str) -> Result<()> {
        if self.admin == Some(user_id) {
            Ok(())
        } else {
            Err(StatusError::Unauthorized {
                user_id,
                command: command.to_string(),
            })
        }
    }
}
