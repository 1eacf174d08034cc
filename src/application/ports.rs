//! Port traits describing the worker's external collaborators.
//!
//! The orchestrator is written against these traits so the broker-facing
//! loop can be exercised with fakes; the `infra` module provides the
//! Postgres, HTTP, and S3 implementations wired up in `main`.

use async_trait::async_trait;
use image::RgbaImage;
use thiserror::Error;

use crate::domain::task::TaskStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("status store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("template request failed: {0}")]
    Transport(String),
    #[error("template responded with status {status}")]
    Status { status: u16 },
    #[error("template body is not a decodable image: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("bucket provisioning failed: {0}")]
    Bucket(String),
    #[error("artifact upload failed: {0}")]
    Upload(String),
}

/// Write access to the shared task record.
///
/// Implementations update the row for `task_id` if it still exists; an
/// unknown identifier is a silent no-op, never an error.
#[async_trait]
pub trait TaskStatusStore: Send + Sync {
    async fn set_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        image_url: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Retrieval of template images by URL.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RgbaImage, FetchError>;
}

/// Durable storage for rendered artifacts, returning the public URL.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn publish(&self, task_id: &str, bytes: Vec<u8>) -> Result<String, PublishError>;
}
