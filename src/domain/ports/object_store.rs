use crate::domain::errors::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DomainError>;
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DomainError>;
}
