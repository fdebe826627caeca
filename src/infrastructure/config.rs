use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::application::{ChatPrompts, SummaryPrompts};
use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const DEFAULT_PROMPTS_PATH: &str = "config/prompts.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings plus prompt templates, as loaded by both binaries.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Loads `CONFIG_PATH` and `PROMPTS_PATH` (falling back to defaults when
    /// the files are absent) and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let prompts_path =
            std::env::var("PROMPTS_PATH").unwrap_or_else(|_| DEFAULT_PROMPTS_PATH.into());

        let mut config: Config = read_yaml_or_default(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        let prompts: PromptsConfig = read_yaml_or_default(&prompts_path)?;

        Ok(Self { config, prompts })
    }
}

fn read_yaml_or_default<T>(path: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !Path::new(path).exists() {
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub aws: AwsConfig,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub chunking: ChunkingConfig,
    pub rag: RagConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
}

impl Config {
    /// Overrides fields from environment variables. `lookup` is injected so
    /// tests do not have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("ADMIN_PORT") {
            self.server.admin_port = parse_env("ADMIN_PORT", &v)?;
        }
        if let Some(v) = get("USER_PORT") {
            self.server.user_port = parse_env("USER_PORT", &v)?;
        }

        if let Some(v) = get("AWS_REGION") {
            self.aws.region = v;
        }
        if let Some(v) = get("AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = Some(v);
        }
        if let Some(v) = get("AWS_SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = Some(v);
        }
        if let Some(v) = get("S3_BUCKET_NAME") {
            self.aws.s3_bucket = Some(v);
        }

        if let Some(v) = get("QDRANT_URL") {
            self.qdrant.url = v;
        }
        if let Some(v) = get("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(v);
        }
        if let Some(v) = get("QDRANT_COLLECTION") {
            self.qdrant.collection = Some(v);
        }
        if let Some(v) = get("QDRANT_CLIENT_TIMEOUT") {
            self.qdrant.timeout_seconds = parse_env("QDRANT_CLIENT_TIMEOUT", &v)?;
        }
        if let Some(v) = get("QDRANT_UPLOAD_TIMEOUT") {
            self.qdrant.upload_timeout_seconds = parse_env("QDRANT_UPLOAD_TIMEOUT", &v)?;
        }

        if let Some(v) = get("EMBEDDING_MODEL_ID") {
            self.embedding.model = v;
        }
        if let Some(v) = get("LLM_MODEL_ID") {
            self.llm.model = v;
        }
        if let Some(v) = get("REDIS_URL") {
            self.memory.redis_url = Some(v);
        }
        if let Some(v) = get("LOG_DIR") {
            self.logging.dir = Some(v);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "embedding.batch_size must be greater than zero".into(),
            ));
        }
        if self.memory.summarize_every == 0 {
            return Err(ConfigError::Invalid(
                "memory.summarize_every must be greater than zero".into(),
            ));
        }
        if self.memory.ttl_seconds == 0 {
            return Err(ConfigError::Invalid(
                "memory.ttl_seconds must be greater than zero".into(),
            ));
        }
        check_seconds("qdrant.timeout_seconds", self.qdrant.timeout_seconds, false)?;
        check_seconds(
            "qdrant.upload_timeout_seconds",
            self.qdrant.upload_timeout_seconds,
            false,
        )?;
        check_seconds(
            "qdrant.retry_backoff_seconds",
            self.qdrant.retry_backoff_seconds,
            true,
        )?;
        Ok(())
    }
}

/// Durations must be finite and non-negative; timeouts must also be non-zero.
fn check_seconds(key: &str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let in_range = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
    if !in_range || Duration::try_from_secs_f64(value).is_err() {
        return Err(ConfigError::Invalid(format!(
            "{key} must be a finite number of seconds, got {value}"
        )));
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub admin_port: u16,
    pub user_port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            admin_port: 8501,
            user_port: 8502,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub s3_bucket: Option<String>,
    pub upload_prefix: String,
    pub upload_retry: RetryPolicy,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "ap-south-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            s3_bucket: None,
            upload_prefix: "uploads".to_string(),
            upload_retry: RetryPolicy::exponential(3),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: Option<String>,
    pub timeout_seconds: f64,
    pub upload_timeout_seconds: f64,
    pub connect_retries: u32,
    pub upsert_retries: u32,
    pub retry_backoff_seconds: f64,
    pub collections_cache_ttl_seconds: u64,
}

impl QdrantConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.upload_timeout_seconds)
    }

    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.connect_retries,
            Duration::from_secs_f64(self.retry_backoff_seconds),
        )
    }

    pub fn upsert_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.upsert_retries,
            Duration::from_secs_f64(self.retry_backoff_seconds),
        )
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: None,
            timeout_seconds: 60.0,
            upload_timeout_seconds: 120.0,
            connect_retries: 3,
            upsert_retries: 3,
            retry_backoff_seconds: 2.0,
            collections_cache_ttl_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Bedrock,
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Bedrock,
            model: "amazon.titan-embed-text-v2:0".to_string(),
            dimension: 1024,
            batch_size: 100,
            retry: RetryPolicy::exponential(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Bedrock,
    Anthropic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Bedrock,
            model: "meta.llama3-8b-instruct-v1:0".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::domain::splitter::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::domain::splitter::DEFAULT_CHUNK_OVERLAP,
            separators: crate::domain::splitter::DEFAULT_SEPARATORS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 7 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub redis_url: Option<String>,
    pub ttl_seconds: u64,
    pub history_window: usize,
    pub summarize_every: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_seconds: 86_400,
            history_window: 5,
            summarize_every: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<String>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: Some("logs".to_string()),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub chat: ChatPrompts,
    pub summary: SummaryPrompts,
}
