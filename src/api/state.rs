use std::sync::Arc;

use crate::application::{ChatService, CollectionService, IngestionService, MemoryService, RagService};
use crate::infrastructure::AppConfig;

/// Shared state of the ingestion API.
#[derive(Clone)]
pub struct AdminState {
    pub ingestion: Arc<IngestionService>,
    pub collections: Arc<CollectionService>,
    pub rag: Arc<RagService>,
    pub config: Arc<AppConfig>,
}

impl AdminState {
    pub fn new(
        ingestion: Arc<IngestionService>,
        collections: Arc<CollectionService>,
        rag: Arc<RagService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            ingestion,
            collections,
            rag,
            config,
        }
    }
}

/// Shared state of the chat API.
#[derive(Clone)]
pub struct UserState {
    pub chat: Arc<ChatService>,
    pub memory: Arc<MemoryService>,
    pub rag: Arc<RagService>,
    pub config: Arc<AppConfig>,
}

impl UserState {
    pub fn new(
        chat: Arc<ChatService>,
        memory: Arc<MemoryService>,
        rag: Arc<RagService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            chat,
            memory,
            rag,
            config,
        }
    }
}
