use crate::domain::{
    errors::DomainError, CollectionAction, DocumentChunk, Embedding, SearchResult,
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>, DomainError>;
    /// Creates `collection` when absent; recreates it when `overwrite` is set.
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        overwrite: bool,
    ) -> Result<CollectionAction, DomainError>;
    /// Writes one point per pair and returns the point ids.
    async fn upsert(
        &self,
        collection: &str,
        points: &[(DocumentChunk, Embedding)],
    ) -> Result<Vec<Uuid>, DomainError>;
    async fn search(
        &self,
        collection: &str,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;
    async fn count(&self, collection: &str) -> Result<u64, DomainError>;
    async fn delete_by_document(
        &self,
        collection: &str,
        document_id: Uuid,
    ) -> Result<(), DomainError>;
}
