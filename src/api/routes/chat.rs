use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error::ApiError, state::UserState};
use crate::application::ChatReply;
use crate::domain::{Conversation, Message};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<Uuid>,
    pub collection: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub transcript: Vec<Message>,
    pub summary: Option<String>,
    pub message_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationResponse {
    fn from(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            transcript: conversation.transcript,
            summary: conversation.summary,
            message_count: conversation.message_count,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

pub async fn chat_handler(
    State(state): State<UserState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = state
        .chat
        .respond(
            request.conversation_id,
            &request.message,
            request.collection.as_deref(),
        )
        .await?;
    Ok(Json(reply))
}

pub async fn get_conversation(
    State(state): State<UserState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = state.memory.get(id).await?;
    Ok(Json(conversation.into()))
}

/// Clears both memories and the transcript.
pub async fn clear_conversation(
    State(state): State<UserState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = state.memory.clear(id).await?;
    Ok(Json(conversation.into()))
}
