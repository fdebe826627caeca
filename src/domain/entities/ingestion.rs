use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the target collection before points were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionAction {
    Created,
    Recreated,
    Appended,
}

impl CollectionAction {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Recreated => "Overwritten",
            Self::Appended => "Appended",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub bucket: Option<String>,
    pub collection: String,
    pub overwrite: bool,
}

impl IngestRequest {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, collection: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            bucket: None,
            collection: collection.into(),
            overwrite: false,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: Uuid,
    pub file_name: String,
    pub bucket: String,
    pub object_key: String,
    pub collection: String,
    pub action: CollectionAction,
    pub chunks_extracted: usize,
    pub embeddings_generated: usize,
    pub vectors_stored: usize,
    pub dropped: usize,
    pub total_vectors: Option<u64>,
}

/// A custom collection name takes precedence over the selected existing one.
pub fn resolve_collection_name(custom: Option<&str>, existing: Option<&str>) -> String {
    let custom = custom.map(str::trim).unwrap_or_default();
    if !custom.is_empty() {
        return custom.to_string();
    }
    existing.map(str::trim).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_name_overrides_existing() {
        assert_eq!(
            resolve_collection_name(Some("  papers "), Some("books")),
            "papers"
        );
    }

    #[test]
    fn test_blank_custom_name_falls_back() {
        assert_eq!(resolve_collection_name(Some("   "), Some(" books")), "books");
        assert_eq!(resolve_collection_name(None, None), "");
    }

    #[test]
    fn test_action_verbs() {
        assert_eq!(CollectionAction::Recreated.verb(), "Overwritten");
        assert_eq!(CollectionAction::Appended.verb(), "Appended");
    }
}
