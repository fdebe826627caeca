use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message as BedrockMessage,
    SystemContentBlock,
};
use aws_sdk_bedrockruntime::Client;

use super::alternating_turns;
use crate::domain::{ports::LlmService, DomainError, Message, MessageRole};
use crate::infrastructure::config::LlmConfig;

/// Text generation through the Bedrock Converse API.
pub struct BedrockLlm {
    client: Client,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl BedrockLlm {
    pub fn new(sdk_config: &SdkConfig, config: &LlmConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    async fn converse(&self, system: &str, turns: Vec<Message>) -> Result<String, DomainError> {
        let messages = turns
            .into_iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::Assistant => ConversationRole::Assistant,
                    _ => ConversationRole::User,
                };
                BedrockMessage::builder()
                    .role(role)
                    .content(ContentBlock::Text(m.content))
                    .build()
                    .map_err(|e| DomainError::internal(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut request = self
            .client
            .converse()
            .model_id(&self.model)
            .set_messages(Some(messages))
            .inference_config(
                InferenceConfiguration::builder()
                    .temperature(self.temperature)
                    .max_tokens(self.max_tokens as i32)
                    .build(),
            );

        if !system.trim().is_empty() {
            request = request.system(SystemContentBlock::Text(system.to_string()));
        }

        let output = request.send().await.map_err(|e| {
            DomainError::external(format!("Bedrock converse failed: {}", DisplayErrorContext(&e)))
        })?;

        let text = output
            .output()
            .and_then(|o| o.as_message().ok())
            .map(|message| {
                message
                    .content()
                    .iter()
                    .filter_map(|block| block.as_text().ok())
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if let Some(usage) = output.usage() {
            tracing::debug!(
                input_tokens = usage.input_tokens(),
                output_tokens = usage.output_tokens(),
                stop_reason = ?output.stop_reason(),
                "bedrock converse completed"
            );
        }

        Ok(text)
    }
}

#[async_trait]
impl LlmService for BedrockLlm {
    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.converse(system, vec![Message::user(prompt)]).await
    }

    async fn chat(
        &self,
        system: &str,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.converse(system, alternating_turns(history, prompt))
            .await
    }
}
