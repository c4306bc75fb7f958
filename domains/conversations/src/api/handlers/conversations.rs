//! Conversation read API handlers

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use helpdesk_common::{Error, Pagination, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::api::middleware::ConversationsState;
use crate::domain::entities::{
    ConversationDetail, ConversationStatus, ConversationSummary, Message, MessageDirection,
};
use crate::repository::CONVERSATION_NOT_FOUND;

/// Message response DTO
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub direction: MessageDirection,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            direction: m.direction,
            content: m.content,
            timestamp: m.timestamp,
        }
    }
}

/// One row of the conversation list
#[derive(Debug, Serialize)]
pub struct ConversationListItem {
    pub id: Uuid,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub last_message: Option<MessageResponse>,
    pub message_count: i64,
}

impl From<ConversationSummary> for ConversationListItem {
    fn from(s: ConversationSummary) -> Self {
        Self {
            id: s.conversation.id,
            status: s.conversation.status,
            created_at: s.conversation.created_at,
            last_message: s.last_message.map(Into::into),
            message_count: s.message_count,
        }
    }
}

/// Conversation with its full message history
#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    pub id: Uuid,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageResponse>,
}

impl From<ConversationDetail> for ConversationDetailResponse {
    fn from(d: ConversationDetail) -> Self {
        Self {
            id: d.conversation.id,
            status: d.conversation.status,
            created_at: d.conversation.created_at,
            messages: d.messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// List conversations, most recently created first
pub async fn list_conversations(
    State(state): State<ConversationsState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<ConversationListItem>>> {
    let summaries = state.store.list_conversations(pagination).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// Get a single conversation with its messages
pub async fn get_conversation(
    State(state): State<ConversationsState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ConversationDetailResponse>> {
    let Path(id) = path.map_err(|e| Error::Validation(e.body_text()))?;

    let detail = state
        .store
        .find_conversation(id)
        .await?
        .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))?;

    Ok(Json(detail.into()))
}
