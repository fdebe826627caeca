mod chat;
mod collections;
mod ingestion;
mod memory;
mod rag;

pub use chat::{ChatPrompts, ChatReply, ChatService, SourceRef};
pub use collections::CollectionService;
pub use ingestion::IngestionService;
pub use memory::{MemoryService, MemorySettings, SummaryPrompts};
pub use rag::RagService;
