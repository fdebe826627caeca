use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, ChunkMetadata, CollectionAction, DocumentChunk, DomainError, Embedding,
    SearchResult,
};
use crate::infrastructure::config::QdrantConfig;
use crate::retry::{self, RetryPolicy};

pub struct QdrantVectorStore {
    client: Qdrant,
    upsert_policy: RetryPolicy,
    upload_timeout: Duration,
}

impl QdrantVectorStore {
    /// Builds the client and probes the server, retrying with a fixed backoff.
    pub async fn connect(config: &QdrantConfig) -> Result<Self, DomainError> {
        let client = retry::with_backoff(&config.connect_policy(), "qdrant_connect", || async move {
            let client = Qdrant::from_url(&config.url)
                .api_key(config.api_key.clone())
                .timeout(config.timeout())
                .build()
                .map_err(|e| DomainError::external(e.to_string()))?;

            client
                .list_collections()
                .await
                .map_err(|e| DomainError::external(format!("Qdrant unreachable: {e}")))?;

            Ok::<_, DomainError>(client)
        })
        .await?;

        tracing::info!(url = %config.url, "Qdrant client initialized");

        Ok(Self {
            client,
            upsert_policy: config.upsert_policy(),
            upload_timeout: config.upload_timeout(),
        })
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, DomainError> {
        match self.client.list_collections().await {
            Ok(list) => Ok(list.collections.iter().any(|c| c.name == collection)),
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch collections list");
                self.client
                    .collection_exists(collection)
                    .await
                    .map_err(|e| DomainError::external(e.to_string()))
            }
        }
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<(), DomainError> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection).vectors_config(VectorParamsBuilder::new(
                    dimension as u64,
                    Distance::Cosine,
                )),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;
        Ok(())
    }

    fn to_point(chunk: &DocumentChunk, embedding: &Embedding) -> Result<PointStruct, DomainError> {
        let payload: Payload = serde_json::json!({
            "text": chunk.content,
            "source": chunk.metadata.source,
            "file_name": chunk.metadata.file_name,
            "chunk_id": chunk.id.to_string(),
            "document_id": chunk.document_id.to_string(),
            "chunk_index": chunk.chunk_index,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            chunk.id.to_string(),
            embedding.as_slice().to_vec(),
            payload,
        ))
    }

    /// Rebuilds a chunk from a stored payload. Points without `text` are
    /// skipped.
    fn from_payload(payload: &HashMap<String, Value>) -> Option<DocumentChunk> {
        let content = payload.get("text")?.as_str()?.to_string();
        let uuid_field = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(Uuid::nil)
        };
        let chunk_index = payload
            .get("chunk_index")
            .and_then(|v| v.as_integer())
            .unwrap_or_default() as usize;
        let source = payload
            .get("source")
            .and_then(|v| v.as_str())
            .cloned()
            .unwrap_or_else(|| format!("chunk_{chunk_index}"));
        let file_name = payload
            .get("file_name")
            .and_then(|v| v.as_str())
            .cloned();

        Some(DocumentChunk {
            id: uuid_field("chunk_id"),
            document_id: uuid_field("document_id"),
            content,
            chunk_index,
            metadata: ChunkMetadata { source, file_name },
        })
    }
}

/// Qdrant reports a missing collection as a "Not found" status; everything
/// else is an upstream failure.
fn collection_error(collection: &str, error: impl std::fmt::Display) -> DomainError {
    let message = error.to_string();
    if message.contains("Not found") || message.contains("doesn't exist") {
        DomainError::not_found(format!("Collection {collection} not found"))
    } else {
        DomainError::external(message)
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        tracing::debug!("fetched Qdrant collections");
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        overwrite: bool,
    ) -> Result<CollectionAction, DomainError> {
        if collection.trim().is_empty() {
            return Err(DomainError::validation("collection name must be non-empty"));
        }

        if !self.collection_exists(collection).await? {
            self.create_collection(collection, dimension).await?;
            tracing::info!(collection, dimension, "created collection");
            return Ok(CollectionAction::Created);
        }

        if !overwrite {
            tracing::info!(collection, "leaving existing collection intact (append mode)");
            return Ok(CollectionAction::Appended);
        }

        self.client
            .delete_collection(collection)
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;
        self.create_collection(collection, dimension).await?;
        tracing::info!(collection, dimension, "recreated collection");
        Ok(CollectionAction::Recreated)
    }

    async fn upsert(
        &self,
        collection: &str,
        points: &[(DocumentChunk, Embedding)],
    ) -> Result<Vec<Uuid>, DomainError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let structs = points
            .iter()
            .map(|(chunk, embedding)| Self::to_point(chunk, embedding))
            .collect::<Result<Vec<_>, _>>()?;

        retry::with_backoff(&self.upsert_policy, "qdrant_upsert", || {
            let request = UpsertPointsBuilder::new(collection, structs.clone()).wait(true);
            async move {
                tokio::time::timeout(self.upload_timeout, self.client.upsert_points(request))
                    .await
                    .map_err(|_| DomainError::timeout("Qdrant upsert timed out"))?
                    .map_err(|e| DomainError::external(e.to_string()))
            }
        })
        .await?;

        tracing::info!(collection, count = points.len(), "uploaded embeddings");
        Ok(points.iter().map(|(chunk, _)| chunk.id).collect())
    }

    async fn search(
        &self,
        collection: &str,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| collection_error(collection, e))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                Some(SearchResult {
                    chunk: Self::from_payload(&point.payload)?,
                    score: point.score,
                })
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(|e| collection_error(collection, e))?;

        Ok(response.result.map(|r| r.count).unwrap_or_default())
    }

    async fn delete_by_document(
        &self,
        collection: &str,
        document_id: Uuid,
    ) -> Result<(), DomainError> {
        let filter = Filter::must([Condition::matches(
            "document_id",
            document_id.to_string(),
        )]);

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(filter)
                    .wait(true),
            )
            .await
            .map_err(|e| collection_error(collection, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_payload_layout() {
        let document_id = Uuid::new_v4();
        let chunk = DocumentChunk::new(document_id, "Backpropagation computes gradients.", 4)
            .with_file_name("nn.pdf");
        let point =
            QdrantVectorStore::to_point(&chunk, &Embedding::new(vec![0.1, 0.2, 0.3])).unwrap();

        let mut keys: Vec<_> = point.payload.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["chunk_id", "chunk_index", "document_id", "file_name", "source", "text"]
        );
        assert_eq!(
            point.payload["text"].as_str().map(String::as_str),
            Some("Backpropagation computes gradients.")
        );
        assert_eq!(point.payload["chunk_index"].as_integer(), Some(4));

        let restored = QdrantVectorStore::from_payload(&point.payload).unwrap();
        assert_eq!(restored.id, chunk.id);
        assert_eq!(restored.document_id, document_id);
        assert_eq!(restored.content, chunk.content);
        assert_eq!(restored.chunk_index, 4);
        assert_eq!(restored.metadata.source, chunk.metadata.source);
        assert_eq!(restored.metadata.file_name.as_deref(), Some("nn.pdf"));
    }

    #[test]
    fn test_payload_without_text_is_skipped() {
        let payload: HashMap<String, Value> =
            HashMap::from([("chunk_index".to_string(), Value::from(1_i64))]);
        assert!(QdrantVectorStore::from_payload(&payload).is_none());
    }

    #[test]
    fn test_sparse_payload_gets_defaults() {
        let payload: HashMap<String, Value> =
            HashMap::from([("text".to_string(), Value::from("loose text"))]);
        let chunk = QdrantVectorStore::from_payload(&payload).unwrap();

        assert_eq!(chunk.id, Uuid::nil());
        assert_eq!(chunk.chunk_index, 0);
        assert_eq!(chunk.metadata.source, "chunk_0");
        assert!(chunk.metadata.file_name.is_none());
    }

    #[test]
    fn test_missing_collection_maps_to_not_found() {
        let err = collection_error(
            "ml",
            "Error in the response: Not found: Collection `ml` doesn't exist!",
        );
        assert!(matches!(err, DomainError::NotFound(_)));

        let err = collection_error("ml", "transport error");
        assert!(matches!(err, DomainError::ExternalService(_)));
    }
}
