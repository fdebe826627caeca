mod bedrock;
mod openai;

use std::sync::Arc;

use aws_config::SdkConfig;

use crate::domain::{ports::EmbeddingService, DomainError};
use crate::infrastructure::config::{EmbeddingConfig, EmbeddingProvider};

pub use bedrock::BedrockEmbedding;
pub use openai::OpenAiEmbedding;

pub fn build(
    config: &EmbeddingConfig,
    sdk_config: &SdkConfig,
) -> Result<Arc<dyn EmbeddingService>, DomainError> {
    tracing::info!(provider = ?config.provider, model = %config.model, "initializing embeddings");
    Ok(match config.provider {
        EmbeddingProvider::Bedrock => Arc::new(BedrockEmbedding::new(sdk_config, config)),
        EmbeddingProvider::OpenAi => Arc::new(OpenAiEmbedding::from_config(config)?),
    })
}
