use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::ConversationStore, Conversation, DomainError};

pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<Uuid, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, id: Uuid) -> Result<Option<Conversation>, DomainError> {
        Ok(self
            .conversations
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .get(&id)
            .cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError> {
        self.conversations
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageRole;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryConversationStore::new();
        let mut conv = Conversation::new();
        conv.add_message(MessageRole::User, "hello");

        store.save(&conv).await.unwrap();
        let loaded = store.load(conv.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages, conv.messages);

        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.ping().await.is_ok());
    }
}
