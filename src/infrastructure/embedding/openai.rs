use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// OpenAI embeddings through `rig`, selected with `embedding.provider: openai`.
pub struct OpenAiEmbedding {
    client: openai::Client,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedding {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        if std::env::var(API_KEY_VAR).map_or(true, |key| key.trim().is_empty()) {
            return Err(DomainError::validation(format!(
                "{API_KEY_VAR} must be set for the openai embedding provider"
            )));
        }

        Ok(Self {
            client: openai::Client::from_env(),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| DomainError::external("OpenAI returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let documents = texts
            .iter()
            .try_fold(
                EmbeddingsBuilder::new(self.client.embedding_model(&self.model)),
                |builder, text| builder.document(text.to_string()),
            )
            .map_err(|e| DomainError::external(format!("OpenAI embedding request: {e}")))?;

        let embedded = documents
            .build()
            .await
            .map_err(|e| DomainError::external(format!("OpenAI embedding failed: {e}")))?;

        let vectors: Vec<Embedding> = embedded
            .into_iter()
            .map(|(_, embeddings)| {
                Embedding::new(embeddings.first().vec.into_iter().map(|x| x as f32).collect())
            })
            .collect();

        if let Some(first) = vectors.first() {
            if first.dimension() != self.dimension {
                tracing::warn!(
                    expected = self.dimension,
                    actual = first.dimension(),
                    model = %self.model,
                    "embedding dimension differs from configuration"
                );
            }
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
