use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::domain::{ports::ObjectStore, DomainError};

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DomainError> {
        let size = bytes.len();
        tracing::info!(bucket, key, size, "uploading to s3://{bucket}/{key}");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                DomainError::external(format!("S3 upload failed: {}", DisplayErrorContext(&e)))
            })?;

        tracing::info!(bucket, key, "upload successful");
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DomainError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .is_some_and(|se| se.is_not_found() || se.code() == Some("NotFound"));
                if not_found {
                    Ok(false)
                } else {
                    Err(DomainError::external(format!(
                        "S3 head_bucket failed: {}",
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }
}
