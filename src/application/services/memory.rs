use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ports::{ConversationStore, LlmService},
    Conversation, DomainError, Message, MessageRole,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    /// Placeholders: `{summary}`, `{history}`.
    pub template: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: "You summarize conversations between a user and an AI assistant.".to_string(),
            template: "Progressively summarize the lines of conversation provided, adding onto \
the previous summary and returning a new summary.\n\n\
Current summary:\n{summary}\n\n\
New lines of conversation:\n{history}\n\n\
New summary:"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemorySettings {
    /// Number of buffered messages sent along with each question.
    pub history_window: usize,
    /// Summarize after every `summarize_every` user messages; 0 disables.
    pub summarize_every: u64,
    pub prompts: SummaryPrompts,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            history_window: 5,
            summarize_every: 10,
            prompts: SummaryPrompts::default(),
        }
    }
}

type TurnLocks = Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>;

/// Short-term buffer plus a running LLM summary, persisted per conversation.
pub struct MemoryService {
    store: Arc<dyn ConversationStore>,
    llm: Arc<dyn LlmService>,
    settings: MemorySettings,
    locks: TurnLocks,
}

/// Exclusive access to one conversation between its load and its save.
pub struct ConversationGuard<'a> {
    locks: &'a TurnLocks,
    id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for ConversationGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // the map and this guard hold the only references: nobody is waiting
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            locks.remove(&self.id);
        }
    }
}

impl MemoryService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        llm: Arc<dyn LlmService>,
        settings: MemorySettings,
    ) -> Self {
        Self {
            store,
            llm,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until no other turn holds conversation `id`. Hold the guard
    /// across load, update and save.
    pub async fn lock(&self, id: Uuid) -> ConversationGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(id).or_default().clone()
        };
        ConversationGuard {
            locks: &self.locks,
            id,
            _guard: lock.lock_owned().await,
        }
    }

    /// An unknown id starts a fresh conversation under that id.
    pub async fn load_or_create(&self, id: Option<Uuid>) -> Result<Conversation, DomainError> {
        let Some(id) = id else {
            return Ok(Conversation::new());
        };

        match self.store.load(id).await? {
            Some(conversation) => Ok(conversation),
            None => {
                tracing::debug!(conversation_id = %id, "starting new conversation");
                Ok(Conversation::with_id(id))
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Conversation, DomainError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Conversation {id} not found")))
    }

    pub fn history<'a>(&self, conversation: &'a Conversation) -> &'a [Message] {
        conversation.recent_messages(self.settings.history_window)
    }

    pub fn remember_turn(&self, conversation: &mut Conversation, question: &str, answer: &str) {
        conversation.add_message(MessageRole::User, question);
        conversation.add_message(MessageRole::Assistant, answer);
    }

    /// Folds the buffer into the running summary when the user message count
    /// hits the cadence. A failed summary keeps the buffer as it is.
    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    pub async fn maybe_summarize(&self, conversation: &mut Conversation) -> bool {
        let every = self.settings.summarize_every;
        if every == 0 || conversation.message_count == 0 || conversation.message_count % every != 0
        {
            return false;
        }
        if conversation.messages.is_empty() {
            return false;
        }

        let history = conversation
            .messages
            .iter()
            .map(|m| format!("{}: {}", speaker(m.role), m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = self
            .settings
            .prompts
            .template
            .replace("{summary}", conversation.summary.as_deref().unwrap_or_default())
            .replace("{history}", &history);

        match self
            .llm
            .complete_with_system(&self.settings.prompts.system, &prompt)
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => {
                tracing::info!(
                    messages = conversation.messages.len(),
                    "summarized conversation"
                );
                conversation.summary = Some(summary.trim().to_string());
                conversation.clear_short_term();
                true
            }
            Ok(_) => {
                tracing::warn!("summarization returned empty text");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "summarization failed");
                false
            }
        }
    }

    /// Prepends the running summary, if any, to `base`.
    pub fn system_prompt(&self, base: &str, conversation: &Conversation) -> String {
        match conversation.summary.as_deref().filter(|s| !s.is_empty()) {
            Some(summary) => format!("Summary of the conversation so far:\n{summary}\n\n{base}"),
            None => base.to_string(),
        }
    }

    pub async fn save(&self, conversation: &Conversation) -> Result<(), DomainError> {
        self.store.save(conversation).await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, id: Uuid) -> Result<Conversation, DomainError> {
        let _turn = self.lock(id).await;
        let mut conversation = self.get(id).await?;
        conversation.reset();
        self.store.save(&conversation).await?;
        tracing::info!("chat cleared");
        Ok(conversation)
    }

    pub async fn ping(&self) -> Result<(), DomainError> {
        self.store.ping().await
    }
}

fn speaker(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "Human",
        MessageRole::Assistant => "AI",
        MessageRole::System => "System",
    }
}
