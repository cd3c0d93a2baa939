//! AWS S3 object writer.
//!
//! Used to publish build artifacts (the sitemap) to the static-site bucket.

use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};

/// Writes objects into one bucket.
#[derive(Clone)]
pub struct S3Objects {
    client: Client,
    bucket: String,
}

impl S3Objects {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Create an object writer from the ambient AWS configuration.
    pub async fn from_env(bucket: &str) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Ok(Self::new(Client::new(&config), bucket))
    }

    /// Upload bytes under `key`, replacing any existing object.
    pub async fn write_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::store(DisplayErrorContext(&e)))?;

        log::info!("Wrote s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
