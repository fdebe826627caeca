mod conversation;
mod document;
mod embedding;
mod ingestion;

pub use conversation::{Conversation, Message, MessageRole};
pub use document::{
    file_extension, has_pdf_signature, is_pdf_file_name, sanitize_text, ChunkMetadata, Document, DocumentChunk,
    SearchResult, PDF_CONTENT_TYPE,
};
pub use embedding::Embedding;
pub use ingestion::{resolve_collection_name, CollectionAction, IngestReport, IngestRequest};
