//! Transaction helpers for the Conversations domain
//!
//! Every state-changing write runs inside a transaction that first locks the
//! conversation row, so the status check and the write see the same state.

use super::conversations::CONVERSATION_COLUMNS;
use super::messages::MESSAGE_COLUMNS;
use crate::domain::entities::{Conversation, Message};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Load a conversation and hold a row lock on it until the transaction ends
pub async fn lock_conversation_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Conversation>, sqlx::Error> {
    let query = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, Conversation>(&query)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

/// Persist status, closed_at and updated_at of a locked conversation
pub async fn update_conversation_tx(
    tx: &mut Transaction<'_, Postgres>,
    conv: &Conversation,
) -> Result<Conversation, sqlx::Error> {
    let query = format!(
        "UPDATE conversations SET \
            status = $2, closed_at = $3, updated_at = $4 \
         WHERE id = $1 \
         RETURNING {CONVERSATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Conversation>(&query)
        .bind(conv.id)
        .bind(conv.status)
        .bind(conv.closed_at)
        .bind(conv.updated_at)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row)
}

/// Insert a message within a transaction
pub async fn insert_message_tx(
    tx: &mut Transaction<'_, Postgres>,
    msg: &Message,
) -> Result<Message, sqlx::Error> {
    let query = format!(
        "INSERT INTO messages ({MESSAGE_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {MESSAGE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Message>(&query)
        .bind(msg.id)
        .bind(msg.conversation_id)
        .bind(msg.direction)
        .bind(&msg.content)
        .bind(msg.timestamp)
        .bind(msg.created_at)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row)
}
