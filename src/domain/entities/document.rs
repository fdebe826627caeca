use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An uploaded file and where its original bytes live in object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub bucket: String,
    pub object_key: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document whose object key is `{prefix}/{id}{ext}`, the
    /// extension being taken from the uploaded file name.
    pub fn new(file_name: impl Into<String>, bucket: impl Into<String>, prefix: &str) -> Self {
        let file_name = file_name.into();
        let id = Uuid::new_v4();
        let object_key = format!(
            "{}/{}{}",
            prefix.trim_end_matches('/'),
            id,
            file_extension(&file_name).unwrap_or_default()
        );

        Self {
            id,
            file_name,
            content_type: PDF_CONTENT_TYPE.to_string(),
            bucket: bucket.into(),
            object_key,
            created_at: Utc::now(),
        }
    }
}

/// Returns the extension of `file_name` including the leading dot.
pub fn file_extension(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
}

pub fn is_pdf_file_name(file_name: &str) -> bool {
    file_extension(file_name).is_some_and(|ext| ext.eq_ignore_ascii_case(".pdf"))
}

/// True when `bytes` open with the `%PDF` header.
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::for_index(chunk_index),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.metadata.file_name = Some(file_name.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub file_name: Option<String>,
}

impl ChunkMetadata {
    pub fn for_index(chunk_index: usize) -> Self {
        Self {
            source: format!("chunk_{chunk_index}"),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Removes characters the vector store and the models reject: NUL, other
/// control characters that are not whitespace, and U+FFFD left behind by
/// lossy decoding. Returns the cleaned text and whether anything was removed.
pub fn sanitize_text(text: &str) -> (String, bool) {
    let cleaned: String = text
        .chars()
        .filter(|c| !(*c == '\u{FFFD}' || (c.is_control() && !c.is_whitespace())))
        .collect();
    let changed = cleaned.len() != text.len();
    (cleaned, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_uses_prefix_and_extension() {
        let doc = Document::new("Lecture Notes.PDF", "bucket", "uploads/");
        assert_eq!(doc.object_key, format!("uploads/{}.PDF", doc.id));
        assert_eq!(doc.bucket, "bucket");
        assert_eq!(doc.content_type, PDF_CONTENT_TYPE);
    }

    #[test]
    fn test_is_pdf_file_name() {
        assert!(is_pdf_file_name("paper.pdf"));
        assert!(is_pdf_file_name("PAPER.Pdf"));
        assert!(!is_pdf_file_name("paper.txt"));
        assert!(!is_pdf_file_name("pdf"));
    }

    #[test]
    fn test_chunk_source_follows_index() {
        let chunk = DocumentChunk::new(Uuid::new_v4(), "text", 3).with_file_name("a.pdf");
        assert_eq!(chunk.metadata.source, "chunk_3");
        assert_eq!(chunk.metadata.file_name.as_deref(), Some("a.pdf"));
    }

    #[test]
    fn test_sanitize_text_strips_control_characters() {
        let (cleaned, changed) = sanitize_text("gradient\u{0} descent\u{FFFD}\n\tok");
        assert_eq!(cleaned, "gradient descent\n\tok");
        assert!(changed);

        let (same, changed) = sanitize_text("plain text\n");
        assert_eq!(same, "plain text\n");
        assert!(!changed);
    }
}
