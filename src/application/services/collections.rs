use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::domain::{ports::VectorStore, DomainError};

/// Collection listing with a time-bounded cache, and point counts.
pub struct CollectionService {
    vector_store: Arc<dyn VectorStore>,
    ttl: Duration,
    cache: RwLock<Option<(Instant, Vec<String>)>>,
}

impl CollectionService {
    pub fn new(vector_store: Arc<dyn VectorStore>, ttl: Duration) -> Self {
        Self {
            vector_store,
            ttl,
            cache: RwLock::new(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<String>, DomainError> {
        if let Some((fetched_at, names)) = self.cache.read().await.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(names.clone());
            }
        }

        let names = self.vector_store.list_collections().await.map_err(|e| {
            tracing::error!(error = %e, "error fetching collections");
            e
        })?;

        *self.cache.write().await = Some((Instant::now(), names.clone()));
        Ok(names)
    }

    #[instrument(skip(self))]
    pub async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        let collection = collection.trim();
        if collection.is_empty() {
            return Err(DomainError::validation(
                "collection_name must be a non-empty string",
            ));
        }

        let total = self.vector_store.count(collection).await?;
        tracing::info!(collection, total, "total vectors");
        Ok(total)
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryVectorStore;

    #[tokio::test]
    async fn test_list_is_cached_until_invalidated() {
        let store = Arc::new(InMemoryVectorStore::new());
        let service = CollectionService::new(store.clone(), Duration::from_secs(600));

        store.ensure_collection("a", 2, false).await.unwrap();
        assert_eq!(service.list().await.unwrap(), vec!["a"]);

        store.ensure_collection("b", 2, false).await.unwrap();
        assert_eq!(service.list().await.unwrap(), vec!["a"]);

        service.invalidate().await;
        assert_eq!(service.list().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_refreshes() {
        let store = Arc::new(InMemoryVectorStore::new());
        let service = CollectionService::new(store.clone(), Duration::ZERO);

        assert!(service.list().await.unwrap().is_empty());
        store.ensure_collection("a", 2, false).await.unwrap();
        assert_eq!(service.list().await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_count_rejects_blank_name() {
        let service =
            CollectionService::new(Arc::new(InMemoryVectorStore::new()), Duration::ZERO);
        let err = service.count("  ").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
