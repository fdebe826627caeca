use crate::domain::{errors::DomainError, Message};
use async_trait::async_trait;

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete_with_system(&self, system: &str, prompt: &str)
        -> Result<String, DomainError>;
    /// Sends `prompt` as the newest user turn after `history`.
    async fn chat(
        &self,
        system: &str,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, DomainError>;
}
