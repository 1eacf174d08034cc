//! HTTP template retrieval.

use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;

use crate::application::ports::{FetchError, TemplateSource};

/// Fetches template images over HTTP with a bounded per-request timeout.
pub struct HttpTemplateSource {
    client: reqwest::Client,
}

impl HttpTemplateSource {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn fetch(&self, url: &str) -> Result<RgbaImage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let response = response.error_for_status().map_err(|err| {
            FetchError::Status {
                status: err.status().map(|code| code.as_u16()).unwrap_or(0),
            }
        })?;

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let decoded = image::load_from_memory(&body)
            .map_err(|err| FetchError::Decode(err.to_string()))?;

        Ok(decoded.to_rgba8())
    }
}
