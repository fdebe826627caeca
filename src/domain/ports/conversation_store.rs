use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Conversation};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<Conversation>, DomainError>;
    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError>;
    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
