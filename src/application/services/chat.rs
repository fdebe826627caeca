use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

use crate::application::{MemoryService, RagService};
use crate::domain::{ports::LlmService, Conversation, DomainError, MessageRole, SearchResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system: String,
    /// Placeholders: `{context}`, `{question}`.
    pub user_template: String,
    pub no_context: String,
    pub empty_question: String,
    pub empty_response: String,
    pub fallback: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful, concise, and knowledgeable AI assistant.\n\
You answer questions strictly using only the information provided in <context>.\n\
You do not use prior knowledge or make assumptions beyond the given context.\n\n\
Instructions:\n\
- If the answer is found in the context, answer concisely and accurately.\n\
- If the answer is not found in the context, reply exactly with:\n\
\"I'm sorry, I could not find enough information to answer that.\"\n\
- Do not mention your limitations or training data.\n\
- Do not repeat the context in your answer.\n\
- Stay strictly within the Machine Learning domain."
                .to_string(),
            user_template: "<context>\n{context}\n</context>\n\nQuestion:\n{question}".to_string(),
            no_context: "No relevant context found.".to_string(),
            empty_question: "Please enter a valid question.".to_string(),
            empty_response: "I apologize, but I couldn't generate a proper response.".to_string(),
            fallback: "I'm having trouble right now. Could you rephrase that?".to_string(),
        }
    }
}

/// A retrieved chunk that went into the answer's context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_id: Uuid,
    pub file_name: Option<String>,
    pub chunk_index: usize,
    pub score: f32,
}

impl From<&SearchResult> for SourceRef {
    fn from(result: &SearchResult) -> Self {
        Self {
            document_id: result.chunk.document_id,
            file_name: result.chunk.metadata.file_name.clone(),
            chunk_index: result.chunk.chunk_index,
            score: result.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub conversation_id: Uuid,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    /// True when the answer is the canned reply for a failed retrieval or
    /// model call.
    pub fallback: bool,
}

pub struct ChatService {
    rag: Arc<RagService>,
    memory: Arc<MemoryService>,
    llm: Arc<dyn LlmService>,
    prompts: ChatPrompts,
    default_collection: Option<String>,
    llm_timeout: Duration,
}

impl ChatService {
    pub fn new(
        rag: Arc<RagService>,
        memory: Arc<MemoryService>,
        llm: Arc<dyn LlmService>,
        prompts: ChatPrompts,
    ) -> Self {
        Self {
            rag,
            memory,
            llm,
            prompts,
            default_collection: None,
            llm_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_default_collection(mut self, collection: Option<String>) -> Self {
        self.default_collection = collection.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    #[instrument(skip(self, question))]
    pub async fn respond(
        &self,
        conversation_id: Option<Uuid>,
        question: &str,
        collection: Option<&str>,
    ) -> Result<ChatReply, DomainError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(ChatReply {
                conversation_id: conversation_id.unwrap_or_else(Uuid::new_v4),
                answer: self.prompts.empty_question.clone(),
                sources: Vec::new(),
                fallback: false,
            });
        }

        let collection = collection
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(self.default_collection.as_deref())
            .ok_or_else(|| DomainError::validation("Please specify a Qdrant collection name."))?;

        let id = conversation_id.unwrap_or_else(Uuid::new_v4);
        let _turn = self.memory.lock(id).await;
        let mut conversation = self.memory.load_or_create(Some(id)).await?;
        conversation.message_count += 1;
        conversation.add_to_transcript(MessageRole::User, question);
        tracing::info!(
            conversation_id = %conversation.id,
            message_count = conversation.message_count,
            "user message received"
        );

        let (answer, sources, fallback) =
            match self.generate(&conversation, question, collection).await {
                Ok((answer, sources)) if answer.is_empty() => {
                    tracing::warn!("model returned an empty answer");
                    (self.prompts.empty_response.clone(), sources, false)
                }
                Ok((answer, sources)) => {
                    self.memory
                        .remember_turn(&mut conversation, question, &answer);
                    (answer, sources, false)
                }
                Err(e) => {
                    tracing::error!(error = %e, "error generating response");
                    (self.prompts.fallback.clone(), Vec::new(), true)
                }
            };

        if !fallback {
            self.memory.maybe_summarize(&mut conversation).await;
        }

        conversation.add_to_transcript(MessageRole::Assistant, answer.as_str());
        self.memory.save(&conversation).await?;
        tracing::info!(conversation_id = %conversation.id, fallback, "response generated");

        Ok(ChatReply {
            conversation_id: conversation.id,
            answer,
            sources,
            fallback,
        })
    }

    async fn generate(
        &self,
        conversation: &Conversation,
        question: &str,
        collection: &str,
    ) -> Result<(String, Vec<SourceRef>), DomainError> {
        let results = self.rag.retrieve(collection, question).await?;
        tracing::info!(retrieved = results.len(), collection, "retrieved documents");

        let context = if results.is_empty() {
            self.prompts.no_context.clone()
        } else {
            results
                .iter()
                .map(|r| r.chunk.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        let prompt = render(
            &self.prompts.user_template,
            &[("context", &context), ("question", question)],
        );
        let system = self.memory.system_prompt(&self.prompts.system, conversation);
        let history = self.memory.history(conversation);
        tracing::debug!(
            history = history.len(),
            system = %system,
            prompt = %prompt,
            "rendered prompt"
        );

        let answer = tokio::time::timeout(self.llm_timeout, self.llm.chat(&system, history, &prompt))
            .await
            .map_err(|_| {
                DomainError::timeout(format!(
                    "LLM did not answer within {}s",
                    self.llm_timeout.as_secs_f32()
                ))
            })??;

        Ok((
            answer.trim().to_string(),
            results.iter().map(SourceRef::from).collect(),
        ))
    }
}

/// Substitutes `{key}` placeholders in a single pass, so placeholder-like
/// text inside the values is left alone.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let matched = values.iter().find_map(|(key, value)| {
            tail.strip_prefix(key)?
                .strip_prefix('}')
                .map(|after| (*value, after))
        });
        match matched {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
