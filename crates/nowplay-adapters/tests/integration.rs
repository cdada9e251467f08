//! Integration tests for the nowplay-adapters crate.
//!
//! HTTP adapters run against a local wiremock server; the `nowplaying-cli`
//! adapter runs against a small shell script standing in for the binary.

use std::path::Path;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nowplay_adapters::{AdapterError, CatApi, GeminiClient, TelegramTransport};
use nowplay_core::{MessagingTransport, PhotoFeed, StatusError, TextGenerator};

const TOKEN: &str = "123456:TEST";

fn bot_path(method_name: &str) -> String {
    format!("/bot{TOKEN}/{method_name}")
}

fn telegram(server: &MockServer) -> TelegramTransport {
    TelegramTransport::new(TOKEN).with_api_base(server.uri())
}

// ═══════════════════════════════════════════════════════════════════════
//  Telegram
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn send_text_returns_message_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("sendMessage")))
        .and(body_string_contains("Song A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 55, "chat": { "id": 1 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = telegram(&server);
    let id = transport.send_text(1, "▶️ Song A - Album").await.unwrap();
    assert_eq!(id, 55);
}

#[tokio::test]
async fn send_photo_uploads_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("sendPhoto")))
        .and(body_string_contains("name=\"photo\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 56 }
        })))
        .mount(&server)
        .await;

    let art = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    std::fs::write(art.path(), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

    let transport = telegram(&server);
    let id = transport.send_photo(1, art.path(), "caption").await.unwrap();
    assert_eq!(id, 56);
}

#[tokio::test]
async fn edit_media_attaches_uploaded_photo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("editMessageMedia")))
        .and(body_string_contains("attach://photo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 56 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let art = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    std::fs::write(art.path(), b"\x89PNG\r\n\x1a\n").unwrap();

    let transport = telegram(&server);
    assert_eq!(transport.edit_media(1, 56, art.path()).await.unwrap(), 56);
}

#[tokio::test]
async fn unchanged_edit_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("editMessageCaption")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: message is not modified"
        })))
        .mount(&server)
        .await;

    let transport = telegram(&server);
    assert_eq!(transport.edit_caption(1, 56, "same").await.unwrap(), 56);
}

#[tokio::test]
async fn server_errors_are_retryable_transport_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("editMessageText")))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({
            "ok": false,
            "error_code": 502,
            "description": "Bad Gateway"
        })))
        .mount(&server)
        .await;

    let transport = telegram(&server);
    let err = transport.edit_text(1, 56, "text").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, StatusError::TransportFailure { ref operation, .. } if operation == "editMessageText"));
}

#[tokio::test]
async fn missing_photo_file_fails() {
    let server = MockServer::start().await;
    let transport = telegram(&server);
    let result = transport
        .send_photo(1, Path::new("/nonexistent/artwork.jpg"), "caption")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn get_me_and_get_updates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("getMe")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "id": 99, "is_bot": true, "username": "nowplay_bot" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(bot_path("getUpdates")))
        .and(body_string_contains("\"offset\":7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                {
                    "update_id": 7,
                    "message": {
                        "message_id": 3,
                        "chat": { "id": 5 },
                        "from": { "id": 42, "first_name": "Ada" },
                        "text": "/set Working"
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let transport = telegram(&server);
    let me = transport.get_me().await.unwrap();
    assert_eq!(me.username.as_deref(), Some("nowplay_bot"));

    let updates = transport.get_updates(7, 0).await.unwrap();
    assert_eq!(updates.len(), 1);
    let message = updates[0].message.as_ref().unwrap();
    assert_eq!(message.text.as_deref(), Some("/set Working"));
}

#[tokio::test]
async fn invalid_token_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("getMe")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let err = telegram(&server).get_me().await.unwrap_err();
    assert!(matches!(err, AdapterError::Telegram { code: 401, .. }));
}

// ═══════════════════════════════════════════════════════════════════════
//  Gemini and The Cat API
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn gemini_returns_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", "secret"))
        .and(body_string_contains("what is rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [ { "content": { "parts": [ { "text": "A language." } ] } } ]
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new("secret").with_base_url(server.uri());
    assert_eq!(client.generate("what is rust").await.unwrap(), "A language.");
}

#[tokio::test]
async fn gemini_http_error_is_source_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = GeminiClient::new("secret").with_base_url(server.uri());
    let err = client.generate("hi").await.unwrap_err();
    assert!(matches!(err, StatusError::SourceUnavailable { .. }));
}

#[tokio::test]
async fn cat_api_returns_first_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "abc", "url": "https://cdn2.thecatapi.com/images/abc.jpg", "width": 500, "height": 400 }
        ])))
        .mount(&server)
        .await;

    let cats = CatApi::new().with_base_url(server.uri());
    assert_eq!(
        cats.random_photo_url().await.unwrap(),
        "https://cdn2.thecatapi.com/images/abc.jpg"
    );
}

#[tokio::test]
async fn cat_api_empty_list_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let cats = CatApi::new().with_base_url(server.uri());
    assert!(cats.random_photo_url().await.is_err());
}

// ═══════════════════════════════════════════════════════════════════════
//  nowplaying-cli
// ═══════════════════════════════════════════════════════════════════════

#[cfg(unix)]
#[tokio::test]
async fn nowplaying_cli_reads_metadata_and_artwork() {
    use std::os::unix::fs::PermissionsExt;

    use base64::Engine;
    use nowplay_adapters::NowPlayingCli;
    use nowplay_core::{ArtworkStore, MediaSource};

    let dir = tempfile::tempdir().unwrap();
    let png = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nfake");
    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "get-raw" ]; then
  echo '{{'
  echo '    kMRMediaRemoteNowPlayingInfoTitle = "Blue in Green";'
  echo '    kMRMediaRemoteNowPlayingInfoArtist = "Miles Davis";'
  echo '    kMRMediaRemoteNowPlayingInfoPlaybackRate = 0;'
  echo '    kMRMediaRemoteNowPlayingInfoArtworkIdentifier = abc123;'
  echo '}}'
elif [ "$1" = "get" ] && [ "$2" = "artworkData" ]; then
  echo '{png}'
else
  echo "unknown command" >&2
  exit 1
fi
"#
    );
    let program = dir.path().join("nowplaying-cli");
    std::fs::write(&program, script).unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    let artwork_dir = dir.path().join("artwork");
    let cli = NowPlayingCli::new(program.to_string_lossy(), &artwork_dir).with_timeout(3);

    let now_playing = cli.now_playing().await.unwrap();
    assert!(!now_playing.is_playing());
    assert_eq!(now_playing.artwork_id().as_deref(), Some("abc123"));
    assert!(now_playing.render().starts_with("⏸️ Blue in Green"));

    let path = cli.fetch("abc123").await.unwrap();
    assert_eq!(path, artwork_dir.join("artwork-abc123.png"));
    assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));

    // A failing binary surfaces as a source failure.
    let broken = NowPlayingCli::new("/nonexistent/nowplaying-cli", &artwork_dir);
    let err = broken.now_playing().await.unwrap_err();
    assert!(matches!(err, StatusError::SourceUnavailable { .. }));
}
