//! Telegram Bot API transport.
//!
//! Implements [`MessagingTransport`] for the live status message and exposes
//! the two calls the gateway needs, `getMe` and `getUpdates`.  Every method is
//! POSTed to `{api_base}/bot{token}/{method}`; photo uploads use multipart
//! form data.
//!
//! Telegram rejects edits that would leave a message unchanged with
//! "message is not modified".  That answer is treated as success.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use nowplay_core::{ChatId, MessageId, MessagingTransport};

use crate::error::{AdapterError, Result};

/// Default Telegram Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Maximum caption length Telegram accepts, in characters.
pub const CAPTION_LIMIT: usize = 1024;
/// Maximum text message length Telegram accepts, in characters.
pub const TEXT_LIMIT: usize = 4096;

const NOT_MODIFIED: &str = "message is not modified";

// ---------------------------------------------------------------------------
// Incoming update types
// ---------------------------------------------------------------------------

/// Identity of the bot, from `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

/// One entry of a `getUpdates` batch.
///
/// `message` is `None` for update kinds the bot does not handle and for
/// messages that could not be decoded.
#[derive(Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// Decode the `result` array of a `getUpdates` response.
///
/// Entries without an `update_id` are dropped; everything else is kept so the
/// caller can advance its offset past it.
pub fn parse_updates(result: &Value) -> Vec<Update> {
    let Some(entries) = result.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let update_id = entry.get("update_id")?.as_i64()?;
            let message = entry
                .get("message")
                .and_then(|m| serde_json::from_value::<Message>(m.clone()).ok());
            Some(Update { update_id, message })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Telegram Bot API client.
pub struct TelegramTransport {
    api_base: String,
    bot_token: String,
    http: reqwest::Client,
}

impl TelegramTransport {
    /// Create a transport for the bot identified by `bot_token`.
    pub fn new(bot_token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nowplay/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            http,
        }
    }

    /// Point the transport at a different API endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a full Telegram Bot API URL for the given method.
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    /// Check the `ok` field of a Bot API response and return its `result`.
    ///
    /// Telegram responses follow the format:
    /// `{ "ok": true, "result": {...} }` on success, or
    /// `{ "ok": false, "error_code": 400, "description": "..." }` on failure.
    pub fn parse_telegram_response(response: &Value, method: &str) -> Result<Value> {
        let ok = response
            .get("ok")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if !ok {
            let code = response
                .get("error_code")
                .and_then(|v| v.as_i64())
                .unwrap_or(-1);
            let description = response
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(AdapterError::Telegram {
                method: method.to_string(),
                code,
                description: description.to_string(),
            });
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn read_response(method: &str, response: reqwest::Response) -> Result<Value> {
        let body: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::http("telegram", format!("{method}: {e}")))?;
        Self::parse_telegram_response(&body, method)
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value> {
        debug!(method, "calling Telegram");
        let response = self
            .http
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::http("telegram", format!("{method}: {e}")))?;
        Self::read_response(method, response).await
    }

    async fn call_multipart(&self, method: &str, form: Form) -> Result<Value> {
        debug!(method, "calling Telegram (multipart)");
        let response = self
            .http
            .post(self.api_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AdapterError::http("telegram", format!("{method}: {e}")))?;
        Self::read_response(method, response).await
    }

    // -----------------------------------------------------------------------
    // Gateway calls
    // -----------------------------------------------------------------------

    /// Verify the token and return the bot's identity.
    pub async fn get_me(&self) -> Result<BotInfo> {
        let result = self.call("getMe", &json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Long-poll for new updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let result = self.call("getUpdates", &body).await?;
        Ok(parse_updates(&result))
    }

    // -----------------------------------------------------------------------
    // Message calls
    // -----------------------------------------------------------------------

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        let body = json!({
            "chat_id": chat_id,
            "text": clamp_chars(text, TEXT_LIMIT),
        });
        let result = self.call("sendMessage", &body).await?;
        message_id_of(&result, "sendMessage")
    }

    async fn upload_photo(&self, chat_id: ChatId, photo: &Path, caption: &str) -> Result<MessageId> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", clamp_chars(caption, CAPTION_LIMIT))
            .part("photo", photo_part(photo).await?);
        let result = self.call_multipart("sendPhoto", form).await?;
        message_id_of(&result, "sendPhoto")
    }

    async fn send_photo_by_url(&self, chat_id: ChatId, url: &str) -> Result<MessageId> {
        let body = json!({ "chat_id": chat_id, "photo": url });
        let result = self.call("sendPhoto", &body).await?;
        message_id_of(&result, "sendPhoto")
    }

    async fn edit_message_media(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        photo: &Path,
    ) -> Result<MessageId> {
        let media = json!({ "type": "photo", "media": "attach://photo" });
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("message_id", message_id.to_string())
            .text("media", media.to_string())
            .part("photo", photo_part(photo).await?);
        let result = self.call_multipart("editMessageMedia", form).await;
        edited(result, message_id)
    }

    async fn edit_message_caption(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        caption: &str,
    ) -> Result<MessageId> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "caption": clamp_chars(caption, CAPTION_LIMIT),
        });
        let result = self.call("editMessageCaption", &body).await;
        edited(result, message_id)
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<MessageId> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": clamp_chars(text, TEXT_LIMIT),
        });
        let result = self.call("editMessageText", &body).await;
        edited(result, message_id)
    }
}

#[async_trait]
impl MessagingTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> nowplay_core::Result<MessageId> {
        self.send_message(chat_id, text)
            .await
            .map_err(|e| e.into_transport("sendMessage"))
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
    ) -> nowplay_core::Result<MessageId> {
        self.upload_photo(chat_id, photo, caption)
            .await
            .map_err(|e| e.into_transport("sendPhoto"))
    }

    async fn send_photo_url(&self, chat_id: ChatId, url: &str) -> nowplay_core::Result<MessageId> {
        self.send_photo_by_url(chat_id, url)
            .await
            .map_err(|e| e.into_transport("sendPhoto"))
    }

    async fn edit_media(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        photo: &Path,
    ) -> nowplay_core::Result<MessageId> {
        self.edit_message_media(chat_id, message_id, photo)
            .await
            .map_err(|e| e.into_transport("editMessageMedia"))
    }

    async fn edit_caption(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        caption: &str,
    ) -> nowplay_core::Result<MessageId> {
        self.edit_message_caption(chat_id, message_id, caption)
            .await
            .map_err(|e| e.into_transport("editMessageCaption"))
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> nowplay_core::Result<MessageId> {
        self.edit_message_text(chat_id, message_id, text)
            .await
            .map_err(|e| e.into_transport("editMessageText"))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Truncate `text` to at most `limit` characters, never splitting a char.
pub fn clamp_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Whether a Telegram error only says the edit was a no-op.
pub fn is_not_modified(err: &AdapterError) -> bool {
    matches!(err, AdapterError::Telegram { description, .. } if description.contains(NOT_MODIFIED))
}

fn edited(result: Result<Value>, message_id: MessageId) -> Result<MessageId> {
    match result {
        Ok(_) => Ok(message_id),
        Err(e) if is_not_modified(&e) => {
            debug!(message_id, "message not modified, nothing to edit");
            Ok(message_id)
        }
        Err(e) => Err(e),
    }
}

fn message_id_of(result: &Value, method: &str) -> Result<MessageId> {
    result
        .get("message_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| AdapterError::invalid_response("telegram", format!("{method}: no message_id")))
}

/// MIME type for the image formats the artwork store writes.
fn image_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

async fn photo_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artwork.jpg".to_string());
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(image_mime(path))
        .map_err(|e| AdapterError::http("telegram", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_includes_token_and_method() {
        let transport = TelegramTransport::new("123:ABC").with_api_base("http://localhost:9/");
        assert_eq!(
            transport.api_url("sendMessage"),
            "http://localhost:9/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn parse_response_returns_result() {
        let resp = json!({ "ok": true, "result": { "message_id": 5 } });
        let result = TelegramTransport::parse_telegram_response(&resp, "sendMessage").unwrap();
        assert_eq!(result["message_id"], 5);
    }

    #[test]
    fn parse_response_reports_api_errors() {
        let resp = json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        });
        let err = TelegramTransport::parse_telegram_response(&resp, "sendMessage").unwrap_err();
        match err {
            AdapterError::Telegram { code, description, .. } => {
                assert_eq!(code, 400);
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn not_modified_edits_count_as_success() {
        let err = AdapterError::Telegram {
            method: "editMessageCaption".into(),
            code: 400,
            description: "Bad Request: message is not modified: specified new message content \
                          and reply markup are exactly the same"
                .into(),
        };
        assert_eq!(edited(Err(err), 77).unwrap(), 77);
    }

    #[test]
    fn other_edit_errors_propagate() {
        let err = AdapterError::Telegram {
            method: "editMessageCaption".into(),
            code: 400,
            description: "Bad Request: message to edit not found".into(),
        };
        assert!(edited(Err(err), 77).is_err());
    }

    #[test]
    fn image_mime_covers_sniffed_formats() {
        assert_eq!(image_mime(Path::new("artwork-a.jpg")), "image/jpeg");
        assert_eq!(image_mime(Path::new("artwork-a.png")), "image/png");
        assert_eq!(image_mime(Path::new("artwork-a.gif")), "image/gif");
        assert_eq!(image_mime(Path::new("artwork-a.webp")), "image/webp");
        assert_eq!(image_mime(Path::new("artwork-a.PNG")), "image/png");
        assert_eq!(image_mime(Path::new("artwork")), "image/jpeg");
    }

    #[test]
    fn clamp_respects_char_boundaries() {
        let text = "⏳".repeat(1030);
        let clamped = clamp_chars(&text, CAPTION_LIMIT);
        assert_eq!(clamped.chars().count(), CAPTION_LIMIT);
        assert_eq!(clamp_chars("short", CAPTION_LIMIT), "short");
    }

    #[test]
    fn parse_updates_keeps_unhandled_kinds_for_offset() {
        let result = json!([
            {
                "update_id": 10,
                "message": {
                    "message_id": 1,
                    "chat": { "id": -100, "type": "group" },
                    "from": { "id": 42, "first_name": "Ada", "is_bot": false },
                    "text": "/activity"
                }
            },
            { "update_id": 11, "edited_message": { "message_id": 1 } },
            { "no_id": true }
        ]);

        let updates = parse_updates(&result);
        assert_eq!(updates.len(), 2);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, -100);
        assert_eq!(message.from.as_ref().unwrap().id, 42);
        assert_eq!(message.text.as_deref(), Some("/activity"));
        assert_eq!(updates[1].update_id, 11);
        assert!(updates[1].message.is_none());
    }
}
