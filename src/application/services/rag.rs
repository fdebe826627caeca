use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    CollectionAction, DocumentChunk, DomainError, Embedding, SearchResult,
};
use crate::retry::{self, RetryPolicy};

pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
    batch_size: usize,
    retry: RetryPolicy,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            default_top_k,
            batch_size: 100,
            retry: RetryPolicy::exponential(5),
        }
    }

    pub fn with_batching(mut self, batch_size: usize, retry: RetryPolicy) -> Self {
        self.batch_size = batch_size.max(1);
        self.retry = retry;
        self
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    #[instrument(skip(self))]
    pub async fn retrieve(
        &self,
        collection: &str,
        query: &str,
    ) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(collection, query, self.default_top_k)
            .await
    }

    #[instrument(skip(self))]
    pub async fn retrieve_top_k(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        self.vector_store.search(collection, &embedding, top_k).await
    }

    /// Embeds chunks batch by batch, retrying each batch with backoff. A
    /// batch that keeps failing is skipped together with its chunks, so the
    /// returned pairs always line up.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn embed_chunks(
        &self,
        chunks: Vec<DocumentChunk>,
    ) -> Result<Vec<(DocumentChunk, Embedding)>, DomainError> {
        let total_batches = chunks.len().div_ceil(self.batch_size);
        let mut pairs = Vec::with_capacity(chunks.len());

        tracing::info!(
            batch_size = self.batch_size,
            total_batches,
            "generating embeddings"
        );

        for (index, batch) in chunks.chunks(self.batch_size).enumerate() {
            tracing::info!(batch = index + 1, total_batches, "processing batch");
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();

            let result = retry::with_backoff(&self.retry, "embed_batch", || {
                let texts = &texts;
                async move {
                    let embeddings = self.embedding.embed_batch(texts).await?;
                    if embeddings.len() != texts.len() {
                        return Err(DomainError::external(format!(
                            "Expected {} embeddings, got {}",
                            texts.len(),
                            embeddings.len()
                        )));
                    }
                    Ok(embeddings)
                }
            })
            .await;

            match result {
                Ok(embeddings) => pairs.extend(batch.iter().cloned().zip(embeddings)),
                Err(e) => {
                    tracing::error!(batch = index + 1, error = %e, "skipping batch after failed embedding");
                }
            }
        }

        tracing::info!(generated = pairs.len(), "embeddings generated");
        Ok(pairs)
    }

    #[instrument(skip(self))]
    pub async fn prepare_collection(
        &self,
        collection: &str,
        dimension: usize,
        overwrite: bool,
    ) -> Result<CollectionAction, DomainError> {
        self.vector_store
            .ensure_collection(collection, dimension, overwrite)
            .await
    }

    #[instrument(skip(self, pairs), fields(count = pairs.len()))]
    pub async fn index(
        &self,
        collection: &str,
        pairs: &[(DocumentChunk, Embedding)],
    ) -> Result<Vec<Uuid>, DomainError> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        self.vector_store.upsert(collection, pairs).await
    }

    pub async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        self.vector_store.count(collection).await
    }

    #[instrument(skip(self))]
    pub async fn delete_document(
        &self,
        collection: &str,
        document_id: Uuid,
    ) -> Result<(), DomainError> {
        self.vector_store
            .delete_by_document(collection, document_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryVectorStore;
    use crate::test_support::HashEmbedding;
    use std::time::Duration;

    fn chunks(texts: &[&str]) -> Vec<DocumentChunk> {
        let doc_id = Uuid::new_v4();
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| DocumentChunk::new(doc_id, *t, i))
            .collect()
    }

    fn service(embedding: HashEmbedding, batch_size: usize) -> RagService {
        RagService::new(Arc::new(embedding), Arc::new(InMemoryVectorStore::new()), 3)
            .with_batching(batch_size, RetryPolicy::fixed(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_embed_chunks_retries_transient_failures() {
        let embedding = HashEmbedding::new().failing_first(2);
        let rag = service(embedding, 2);

        let pairs = rag.embed_chunks(chunks(&["a", "b", "c"])).await.unwrap();

        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].0.content, "c");
    }

    #[tokio::test]
    async fn test_embed_chunks_skips_failed_batch_and_keeps_alignment() {
        let embedding = HashEmbedding::new().poisoned_by("POISON");
        let rag = service(embedding.clone(), 2);

        let pairs = rag
            .embed_chunks(chunks(&["alpha", "POISON", "gamma", "delta"]))
            .await
            .unwrap();

        let contents: Vec<&str> = pairs.iter().map(|(c, _)| c.content.as_str()).collect();
        assert_eq!(contents, vec!["gamma", "delta"]);
        for (chunk, vector) in &pairs {
            assert_eq!(vector, &embedding.vector_for(&chunk.content));
        }
    }

    #[tokio::test]
    async fn test_index_then_retrieve() {
        let rag = service(HashEmbedding::new(), 10);
        let pairs = rag
            .embed_chunks(chunks(&[
                "neural networks learn weights",
                "kubernetes schedules pods",
            ]))
            .await
            .unwrap();

        let dimension = pairs[0].1.dimension();
        rag.prepare_collection("kb", dimension, false).await.unwrap();
        let ids = rag.index("kb", &pairs).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(rag.count("kb").await.unwrap(), 2);

        let results = rag
            .retrieve_top_k("kb", "neural networks learn weights", 1)
            .await
            .unwrap();
        assert_eq!(results[0].chunk.content, "neural networks learn weights");
    }
}
