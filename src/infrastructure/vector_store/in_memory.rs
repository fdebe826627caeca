use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, CollectionAction, DocumentChunk, DomainError, Embedding, SearchResult,
};

struct Collection {
    dimension: usize,
    points: Vec<(DocumentChunk, Embedding)>,
}

/// Brute-force cosine search over collections held in memory.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(collection: &str) -> DomainError {
    DomainError::not_found(format!("Collection `{collection}` doesn't exist"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let store = self
            .collections
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut names: Vec<String> = store.keys().cloned().collect();
        names.sort();
        Ok(names)
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

        let mut store = self
            .collections
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let action = match (store.contains_key(collection), overwrite) {
            (false, _) => CollectionAction::Created,
            (true, true) => CollectionAction::Recreated,
            (true, false) => return Ok(CollectionAction::Appended),
        };

        store.insert(
            collection.to_string(),
            Collection {
                dimension,
                points: Vec::new(),
            },
        );
        Ok(action)
    }

    async fn upsert(
        &self,
        collection: &str,
        points: &[(DocumentChunk, Embedding)],
    ) -> Result<Vec<Uuid>, DomainError> {
        let mut store = self
            .collections
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let target = store.get_mut(collection).ok_or_else(|| missing(collection))?;

        if let Some((_, bad)) = points
            .iter()
            .find(|(_, e)| e.dimension() != target.dimension)
        {
            return Err(DomainError::validation(format!(
                "Wrong vector dimension: expected {}, got {}",
                target.dimension,
                bad.dimension()
            )));
        }

        let mut ids = Vec::with_capacity(points.len());
        for (chunk, embedding) in points {
            target.points.retain(|(c, _)| c.id != chunk.id);
            target.points.push((chunk.clone(), embedding.clone()));
            ids.push(chunk.id);
        }
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let store = self
            .collections
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let target = store.get(collection).ok_or_else(|| missing(collection))?;

        let mut results: Vec<SearchResult> = target
            .points
            .iter()
            .map(|(chunk, embedding)| SearchResult {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        let store = self
            .collections
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        store
            .get(collection)
            .map(|c| c.points.len() as u64)
            .ok_or_else(|| missing(collection))
    }

    async fn delete_by_document(
        &self,
        collection: &str,
        document_id: Uuid,
    ) -> Result<(), DomainError> {
        let mut store = self
            .collections
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let target = store.get_mut(collection).ok_or_else(|| missing(collection))?;

        target.points.retain(|(chunk, _)| chunk.document_id != document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryVectorStore::new();
        let doc_id = Uuid::new_v4();
        store.ensure_collection("kb", 3, false).await.unwrap();

        let near = DocumentChunk::new(doc_id, "near", 0);
        let far = DocumentChunk::new(doc_id, "far", 1);
        store
            .upsert(
                "kb",
                &[
                    (near, Embedding::new(vec![1.0, 0.0, 0.0])),
                    (far, Embedding::new(vec![0.0, 1.0, 0.0])),
                ],
            )
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let results = store.search("kb", &query, 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "near");
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_ensure_collection_actions() {
        let store = InMemoryVectorStore::new();
        let chunk = DocumentChunk::new(Uuid::new_v4(), "x", 0);

        assert_eq!(
            store.ensure_collection("kb", 2, false).await.unwrap(),
            CollectionAction::Created
        );
        store
            .upsert("kb", &[(chunk, Embedding::new(vec![1.0, 0.0]))])
            .await
            .unwrap();

        assert_eq!(
            store.ensure_collection("kb", 2, false).await.unwrap(),
            CollectionAction::Appended
        );
        assert_eq!(store.count("kb").await.unwrap(), 1);

        assert_eq!(
            store.ensure_collection("kb", 2, true).await.unwrap(),
            CollectionAction::Recreated
        );
        assert_eq!(store.count("kb").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimension_and_missing_collection() {
        let store = InMemoryVectorStore::new();
        let chunk = DocumentChunk::new(Uuid::new_v4(), "x", 0);

        let err = store
            .upsert("nope", &[(chunk.clone(), Embedding::new(vec![1.0]))])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        store.ensure_collection("kb", 2, false).await.unwrap();
        let err = store
            .upsert("kb", &[(chunk, Embedding::new(vec![1.0]))])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let store = InMemoryVectorStore::new();
        let doc_id = Uuid::new_v4();
        store.ensure_collection("kb", 3, false).await.unwrap();

        let chunk = DocumentChunk::new(doc_id, "test", 0);
        store
            .upsert("kb", &[(chunk, Embedding::new(vec![1.0, 0.0, 0.0]))])
            .await
            .unwrap();
        store.delete_by_document("kb", doc_id).await.unwrap();

        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let results = store.search("kb", &query, 10).await.unwrap();

        assert!(results.is_empty());
    }
}
