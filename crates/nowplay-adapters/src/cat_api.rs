//! Random cat pictures from The Cat API for `/cat`.

use async_trait::async_trait;
use serde::Deserialize;

use nowplay_core::PhotoFeed;

use crate::error::{AdapterError, Result};

/// The Cat API base URL.
pub const CAT_API_BASE: &str = "https://api.thecatapi.com/v1";

#[derive(Debug, Deserialize)]
struct CatImage {
    url: String,
}

/// Client for `GET /images/search`.
pub struct CatApi {
    base_url: String,
    http: reqwest::Client,
}

impl Default for CatApi {
    fn default() -> Self {
        Self::new()
    }
}

impl CatApi {
    pub fn new() -> Self {
        Self {
            base_url: CAT_API_BASE.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of one random cat image.
    pub async fn random_image(&self) -> Result<String> {
        let images: Vec<CatImage> = self
            .http
            .get(format!("{}/images/search", self.base_url))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AdapterError::http("thecatapi", e))?
            .json()
            .await
            .map_err(|e| AdapterError::http("thecatapi", e))?;

        images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| AdapterError::invalid_response("thecatapi", "empty image list"))
    }
}

#[async_trait]
impl PhotoFeed for CatApi {
    async fn random_photo_url(&self) -> nowplay_core::Result<String> {
        self.random_image().await.map_err(AdapterError::into_source)
    }
}
