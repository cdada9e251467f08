//! Google Gemini text generation for `/chat`.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use nowplay_core::TextGenerator;

use crate::error::{AdapterError, Result};

/// Gemini REST API base URL.
pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model used for `/chat`.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Minimal `generateContent` client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GOOGLE_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user turn and return the first candidate's
    /// text.
    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });

        debug!(model = %self.model, prompt_len = prompt.len(), "calling Gemini");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::http("gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::http(
                "gemini",
                format!("HTTP {status}: {}", text.chars().take(200).collect::<String>()),
            ));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::http("gemini", e))?;
        extract_text(&json)
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response.
pub fn extract_text(response: &Value) -> Result<String> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AdapterError::invalid_response("gemini", "no candidate text"))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> nowplay_core::Result<String> {
        self.generate_content(prompt)
            .await
            .map_err(AdapterError::into_source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_candidate() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Hello!" } ], "role": "model" } }
            ]
        });
        assert_eq!(extract_text(&response).unwrap(), "Hello!");
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(extract_text(&response).is_err());
    }

    #[test]
    fn builder_overrides_model() {
        let client = GeminiClient::new("key").with_model("gemini-2.0-pro");
        assert_eq!(client.model(), "gemini-2.0-pro");
    }
}
