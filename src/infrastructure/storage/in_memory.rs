use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::domain::{ports::ObjectStore, DomainError};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object store kept in process memory. Buckets must be registered before use.
pub struct InMemoryObjectStore {
    buckets: RwLock<HashSet<String>>,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashSet::new()),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.insert(bucket.into());
        }
        self
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .map(|objects| {
                objects
                    .keys()
                    .filter(|(b, _)| b == bucket)
                    .map(|(_, k)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DomainError> {
        let known = self
            .buckets
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .contains(bucket);
        if !known {
            return Err(DomainError::external(format!("NoSuchBucket: {bucket}")));
        }

        self.objects
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DomainError> {
        Ok(self
            .buckets
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .contains(bucket))
    }
}
