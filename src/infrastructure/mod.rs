pub mod aws;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod pdf;
pub mod storage;
pub mod vector_store;

pub use config::{AppConfig, Config, ConfigError, PromptsConfig};
pub use embedding::{BedrockEmbedding, OpenAiEmbedding};
pub use llm::{AnthropicLlm, BedrockLlm};
pub use memory::{InMemoryConversationStore, RedisConversationStore};
pub use pdf::PdfTextExtractor;
pub use storage::{InMemoryObjectStore, S3ObjectStore};
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
