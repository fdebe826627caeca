use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::anthropic;

use super::flatten_history;
use crate::domain::{ports::LlmService, DomainError, Message};
use crate::infrastructure::config::LlmConfig;

const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Claude through `rig`, selected with `llm.provider: anthropic`. The chat
/// history is flattened into the prompt.
pub struct AnthropicLlm {
    client: anthropic::Client,
    model: String,
    temperature: f64,
    max_tokens: u64,
}

impl AnthropicLlm {
    pub fn from_config(config: &LlmConfig) -> Result<Self, DomainError> {
        if std::env::var(API_KEY_VAR).map_or(true, |key| key.trim().is_empty()) {
            return Err(DomainError::validation(format!(
                "{API_KEY_VAR} must be set for the anthropic LLM provider"
            )));
        }

        Ok(Self {
            client: anthropic::Client::from_env(),
            model: config.model.clone(),
            temperature: f64::from(config.temperature),
            max_tokens: u64::from(config.max_tokens),
        })
    }

    async fn ask(&self, preamble: &str, prompt: &str) -> Result<String, DomainError> {
        let mut agent = self
            .client
            .agent(&self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        if !preamble.trim().is_empty() {
            agent = agent.preamble(preamble);
        }

        agent
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| DomainError::external(format!("Anthropic request failed: {e}")))
    }
}

#[async_trait]
impl LlmService for AnthropicLlm {
    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.ask(system, prompt).await
    }

    async fn chat(
        &self,
        system: &str,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.ask(system, &flatten_history(history, prompt))
            .await
    }
}
