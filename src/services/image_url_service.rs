use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::primitives::ByteStream;

use crate::{
    error::{AppError, Result},
    services::BlobStore,
};

/// Images stored in one S3 bucket and served from `assets_url`.
#[derive(Clone)]
pub struct S3BlobStore {
    client: s3::Client,
    bucket: String,
    assets_url: String,
}

impl S3BlobStore {
    pub fn new(client: s3::Client, bucket: impl Into<String>, assets_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            assets_url: assets_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                AppError::StorageError(format!(
                    "Failed to upload {}: {}",
                    key,
                    s3::Error::from(e)
                ))
            })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::StorageError(format!(
                    "Failed to delete {}: {}",
                    key,
                    s3::Error::from(e)
                ))
            })?;

        Ok(())
    }

    fn assets_url(&self) -> &str {
        &self.assets_url
    }
}
