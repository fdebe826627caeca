mod conversation_store;
mod embedding;
mod llm;
mod object_store;
mod text_extractor;
mod vector_store;

pub use conversation_store::ConversationStore;
pub use embedding::EmbeddingService;
pub use llm::LlmService;
pub use object_store::ObjectStore;
pub use text_extractor::TextExtractor;
pub use vector_store::VectorStore;
