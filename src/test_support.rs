//! Deterministic fakes for the model-backed ports.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::{
    ports::{EmbeddingService, LlmService, TextExtractor},
    DomainError, Embedding, Message,
};

/// Bag-of-words embedding: each lowercase token bumps one hashed bucket.
#[derive(Clone, Default)]
pub struct HashEmbedding {
    calls: Arc<AtomicUsize>,
    failing_first: usize,
    poison: Option<String>,
}

impl HashEmbedding {
    pub const DIMENSION: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    /// The first `n` batch calls fail.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.failing_first = n;
        self
    }

    /// Any batch containing `marker` fails.
    pub fn poisoned_by(mut self, marker: &str) -> Self {
        self.poison = Some(marker.to_string());
        self
    }

    pub fn vector_for(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; Self::DIMENSION];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % Self::DIMENSION] += 1.0;
        }
        Embedding::new(vector)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failing_first {
            return Err(DomainError::external("throttled"));
        }
        if let Some(marker) = &self.poison {
            if texts.iter().any(|t| t.contains(marker.as_str())) {
                return Err(DomainError::external("poisoned batch"));
            }
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }
}

#[derive(Debug, Clone)]
pub struct ChatCall {
    pub system: String,
    pub history: Vec<Message>,
    pub prompt: String,
}

/// Answers chat calls with a fixed reply, or `answer {n}` for the n-th call,
/// and summary calls with a fixed summary.
pub struct ScriptedLlm {
    reply: Option<String>,
    failing_from: Option<usize>,
    delay: Option<Duration>,
    summary: Result<String, String>,
    calls: Mutex<Vec<ChatCall>>,
    summary_prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            reply: None,
            failing_from: None,
            delay: None,
            summary: Ok("Summary.".to_string()),
            calls: Mutex::new(Vec::new()),
            summary_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Some(reply.to_string());
        self
    }

    pub fn failing(self) -> Self {
        self.failing_from(0)
    }

    /// Chat calls from the `n`-th (0-based) onward fail.
    pub fn failing_from(mut self, n: usize) -> Self {
        self.failing_from = Some(n);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Ok(summary.to_string());
        self
    }

    pub fn with_failing_summary(mut self) -> Self {
        self.summary = Err("summary model unavailable".to_string());
        self
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn summary_prompts(&self) -> Vec<String> {
        self.summary_prompts.lock().unwrap().clone()
    }
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete_with_system(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.summary_prompts.lock().unwrap().push(prompt.to_string());
        self.summary.clone().map_err(DomainError::external)
    }

    async fn chat(
        &self,
        system: &str,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, DomainError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(ChatCall {
                system: system.to_string(),
                history: history.to_vec(),
                prompt: prompt.to_string(),
            });
            calls.len() - 1
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_from.is_some_and(|n| index >= n) {
            return Err(DomainError::external("model unavailable"));
        }
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| format!("answer {index}")))
    }
}

pub struct StaticTextExtractor {
    text: String,
}

impl StaticTextExtractor {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

#[async_trait]
impl TextExtractor for StaticTextExtractor {
    async fn extract(&self, _bytes: &[u8]) -> Result<String, DomainError> {
        Ok(self.text.clone())
    }
}
