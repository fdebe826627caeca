//! Use cases: PDF ingestion, collection queries, retrieval and chat with
//! memory. Services only see the domain ports, never concrete adapters.

pub mod services;

pub use services::{
    ChatPrompts, ChatReply, ChatService, CollectionService, IngestionService, MemoryService,
    MemorySettings, RagService, SourceRef, SummaryPrompts,
};
