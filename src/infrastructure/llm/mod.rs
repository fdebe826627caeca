mod anthropic;
mod bedrock;

use std::sync::Arc;

use aws_config::SdkConfig;

use crate::domain::ports::LlmService;
use crate::domain::{DomainError, Message, MessageRole};
use crate::infrastructure::config::{LlmConfig, LlmProvider};

pub use anthropic::AnthropicLlm;
pub use bedrock::BedrockLlm;

pub fn build(
    config: &LlmConfig,
    sdk_config: &SdkConfig,
) -> Result<Arc<dyn LlmService>, DomainError> {
    tracing::info!(provider = ?config.provider, model = %config.model, "initializing LLM");
    Ok(match config.provider {
        LlmProvider::Bedrock => Arc::new(BedrockLlm::new(sdk_config, config)),
        LlmProvider::Anthropic => Arc::new(AnthropicLlm::from_config(config)?),
    })
}

/// Turns chat history plus the new prompt into a strictly alternating
/// user/assistant sequence that starts and ends with a user turn. System
/// messages and leading assistant turns are dropped; consecutive turns of the
/// same role are joined.
pub(crate) fn alternating_turns(history: &[Message], prompt: &str) -> Vec<Message> {
    let mut turns: Vec<Message> = Vec::with_capacity(history.len() + 1);

    let incoming = history
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .cloned()
        .chain(std::iter::once(Message::user(prompt)));

    for message in incoming {
        if turns.is_empty() && message.role != MessageRole::User {
            continue;
        }
        match turns.last_mut() {
            Some(last) if last.role == message.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&message.content);
            }
            _ => turns.push(message),
        }
    }

    turns
}

/// Flattens history into a single prompt for providers driven by one-shot
/// prompts.
pub(crate) fn flatten_history(history: &[Message], prompt: &str) -> String {
    if history.is_empty() {
        return prompt.to_string();
    }

    let context = history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Previous conversation:\n{}\n\nCurrent message from user: {}",
        context, prompt
    )
}
