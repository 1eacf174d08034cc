//! S3-compatible artifact publication.

use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{
    application::ports::{ArtifactStore, PublishError},
    config::StorageSettings,
};

const ARTIFACT_CONTENT_TYPE: &str = "image/jpeg";

/// Stores rendered artifacts in an S3-compatible bucket and hands back the
/// externally reachable URL.
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    public_endpoint: String,
    bucket_ready: OnceCell<()>,
}

impl S3ArtifactStore {
    pub fn new(settings: &StorageSettings) -> Self {
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "memeforge",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(&settings.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: settings.bucket.clone(),
            public_endpoint: settings.public_endpoint.trim_end_matches('/').to_string(),
            bucket_ready: OnceCell::new(),
        }
    }

    /// Create the bucket if needed and apply the public-read policy.
    ///
    /// Both "already exists" variants count as success so replicas can race
    /// on startup. The policy application is best effort: some deployments
    /// pre-provision policies and reject runtime changes.
    async fn ensure_bucket(&self) -> Result<(), PublishError> {
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                debug!(
                    target = "memeforge::storage",
                    bucket = %self.bucket,
                    "bucket created"
                );
            }
            Err(err) => {
                let service_error = err.into_service_error();
                if !service_error.is_bucket_already_owned_by_you()
                    && !service_error.is_bucket_already_exists()
                {
                    return Err(PublishError::Bucket(service_error.to_string()));
                }
            }
        }

        if let Err(err) = self
            .client
            .put_bucket_policy()
            .bucket(&self.bucket)
            .policy(public_read_policy(&self.bucket))
            .send()
            .await
        {
            warn!(
                target = "memeforge::storage",
                bucket = %self.bucket,
                error = %err,
                "failed to apply public-read policy"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn publish(&self, task_id: &str, bytes: Vec<u8>) -> Result<String, PublishError> {
        self.bucket_ready
            .get_or_try_init(|| self.ensure_bucket())
            .await?;

        let key = artifact_key(task_id);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(ARTIFACT_CONTENT_TYPE)
            .send()
            .await
            .map_err(|err| PublishError::Upload(err.to_string()))?;

        Ok(format!("{}/{}/{key}", self.public_endpoint, self.bucket))
    }
}

/// Storage key for a task's artifact. Re-publishing the same task id
/// overwrites the same object.
pub fn artifact_key(task_id: &str) -> String {
    format!("{task_id}.jpg")
}

fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{bucket}/*")]
        }]
    })
    .to_string()
}
