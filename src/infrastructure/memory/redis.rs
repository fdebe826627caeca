use async_trait::async_trait;
use deadpool_redis::{redis::cmd, redis::AsyncCommands, Config, Connection, Pool, Runtime};
use uuid::Uuid;

use crate::domain::{ports::ConversationStore, Conversation, DomainError};

pub type RedisPool = Pool;

pub mod keys {
    use uuid::Uuid;

    pub fn conversation(conversation_id: &Uuid) -> String {
        format!("conversation:{}", conversation_id)
    }
}

pub fn create_pool(redis_url: &str) -> Result<RedisPool, DomainError> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| DomainError::internal(format!("Redis pool error: {e}")))
}

/// Conversations stored as JSON strings that expire `ttl_seconds` after the
/// last write.
#[derive(Clone)]
pub struct RedisConversationStore {
    pool: RedisPool,
    ttl_seconds: u64,
}

impl RedisConversationStore {
    pub fn new(pool: RedisPool, ttl_seconds: u64) -> Self {
        Self { pool, ttl_seconds }
    }

    async fn conn(&self) -> Result<Connection, DomainError> {
        self.pool
            .get()
            .await
            .map_err(|e| DomainError::external(format!("Redis pool error: {e}")))
    }
}

fn redis_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::external(format!("Redis error: {e}"))
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn load(&self, id: Uuid) -> Result<Option<Conversation>, DomainError> {
        let mut conn = self.conn().await?;
        let json: Option<String> = conn
            .get(keys::conversation(&id))
            .await
            .map_err(redis_error)?;

        json.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| DomainError::internal(format!("Corrupt conversation {id}: {e}")))
        })
        .transpose()
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let json =
            serde_json::to_string(conversation).map_err(|e| DomainError::internal(e.to_string()))?;
        let mut conn = self.conn().await?;

        conn.set_ex::<_, _, ()>(keys::conversation(&conversation.id), &json, self.ttl_seconds)
            .await
            .map_err(redis_error)?;

        tracing::debug!(conversation_id = %conversation.id, "conversation saved");
        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.conn().await?;
        let _: String = cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(redis_error)?;
        Ok(())
    }
}
