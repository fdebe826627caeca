mod in_memory;
mod redis;

use std::sync::Arc;

use crate::domain::ports::ConversationStore;
use crate::domain::DomainError;
use crate::infrastructure::config::MemoryConfig;

pub use self::redis::{create_pool, keys, RedisConversationStore, RedisPool};
pub use in_memory::InMemoryConversationStore;

/// Redis when `memory.redis_url` is set, otherwise a process-local store.
pub fn build(config: &MemoryConfig) -> Result<Arc<dyn ConversationStore>, DomainError> {
    match &config.redis_url {
        Some(url) => {
            let pool = create_pool(url)?;
            tracing::info!("Redis pool initialized");
            Ok(Arc::new(RedisConversationStore::new(pool, config.ttl_seconds)))
        }
        None => {
            tracing::warn!("REDIS_URL not set, conversations are kept in process memory");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
    }
}
