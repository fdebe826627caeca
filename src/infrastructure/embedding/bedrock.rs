use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde_json::{json, Value};

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// Cohere embedding models accept at most this many texts per request.
const COHERE_MAX_BATCH: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFamily {
    TitanV1,
    TitanV2,
    Cohere,
}

impl ModelFamily {
    fn from_model_id(model: &str) -> Self {
        if model.starts_with("cohere.") {
            Self::Cohere
        } else if model.contains("titan-embed-text-v2") {
            Self::TitanV2
        } else {
            Self::TitanV1
        }
    }
}

/// Embeddings through Bedrock `InvokeModel`.
pub struct BedrockEmbedding {
    client: Client,
    model: String,
    family: ModelFamily,
    dimension: usize,
}

impl BedrockEmbedding {
    pub fn new(sdk_config: &SdkConfig, config: &EmbeddingConfig) -> Self {
        Self::from_client(Client::new(sdk_config), &config.model, config.dimension)
    }

    pub fn from_client(client: Client, model: impl Into<String>, dimension: usize) -> Self {
        let model = model.into();
        Self {
            client,
            family: ModelFamily::from_model_id(&model),
            model,
            dimension,
        }
    }

    async fn invoke(&self, body: &Value) -> Result<Value, DomainError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| DomainError::internal(e.to_string()))?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(|e| {
                DomainError::external(format!(
                    "Bedrock embedding request failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        serde_json::from_slice(output.body().as_ref())
            .map_err(|e| DomainError::external(format!("Invalid embedding response: {e}")))
    }
}

fn titan_body(family: ModelFamily, text: &str, dimension: usize) -> Value {
    match family {
        ModelFamily::TitanV2 => json!({
            "inputText": text,
            "dimensions": dimension,
            "normalize": true,
        }),
        _ => json!({ "inputText": text }),
    }
}

fn cohere_body(texts: &[&str]) -> Value {
    json!({
        "texts": texts,
        "input_type": "search_document",
        "truncate": "END",
    })
}

fn parse_vector(value: &Value) -> Option<Embedding> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<Vec<f32>>>()
        .map(Embedding::new)
}

fn parse_titan_response(value: &Value) -> Result<Embedding, DomainError> {
    value
        .get("embedding")
        .and_then(parse_vector)
        .ok_or_else(|| DomainError::external("Embedding response has no `embedding` array"))
}

fn parse_cohere_response(value: &Value) -> Result<Vec<Embedding>, DomainError> {
    value
        .get("embeddings")
        .and_then(Value::as_array)
        .and_then(|rows| rows.iter().map(parse_vector).collect::<Option<Vec<_>>>())
        .ok_or_else(|| DomainError::external("Embedding response has no `embeddings` array"))
}

#[async_trait]
impl EmbeddingService for BedrockEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        if self.family == ModelFamily::Cohere {
            return self
                .embed_batch(&[text])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| DomainError::internal("No embedding returned"));
        }

        let response = self
            .invoke(&titan_body(self.family, text, self.dimension))
            .await?;
        parse_titan_response(&response)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());

        if self.family == ModelFamily::Cohere {
            for batch in texts.chunks(COHERE_MAX_BATCH) {
                let response = self.invoke(&cohere_body(batch)).await?;
                embeddings.extend(parse_cohere_response(&response)?);
            }
        } else {
            // Titan embeds one text per request
            for text in texts {
                embeddings.push(self.embed(text).await?);
            }
        }

        if embeddings.len() != texts.len() {
            return Err(DomainError::external(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
