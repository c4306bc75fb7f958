//! Conversation repository

use crate::domain::entities::{
    Conversation, ConversationStatus, ConversationSummary, Message, MessageDirection,
};
use chrono::{DateTime, Utc};
use helpdesk_common::{Pagination, Result};
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const CONVERSATION_COLUMNS: &str =
    "id, status, opened_at, closed_at, created_at, updated_at";

/// Flat row of the list projection
#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    status: ConversationStatus,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    message_count: i64,
    last_message_id: Option<Uuid>,
    last_message_direction: Option<MessageDirection>,
    last_message_content: Option<String>,
    last_message_timestamp: Option<DateTime<Utc>>,
    last_message_created_at: Option<DateTime<Utc>>,
}

impl From<SummaryRow> for ConversationSummary {
    fn from(row: SummaryRow) -> Self {
        let last_message = match (
            row.last_message_id,
            row.last_message_direction,
            row.last_message_content,
            row.last_message_timestamp,
            row.last_message_created_at,
        ) {
            (Some(id), Some(direction), Some(content), Some(timestamp), Some(created_at)) => {
                Some(Message {
                    id,
                    conversation_id: row.id,
                    direction,
                    content,
                    timestamp,
                    created_at,
                })
            }
            _ => None,
        };

        ConversationSummary {
            conversation: Conversation {
                id: row.id,
                status: row.status,
                opened_at: row.opened_at,
                closed_at: row.closed_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            last_message,
            message_count: row.message_count,
        }
    }
}

#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find conversation by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Conversation>> {
        let query = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
        let conv = sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(conv)
    }

    /// Insert a conversation unless its id is taken. `None` means the id
    /// already exists.
    pub async fn create_if_absent(&self, conv: &Conversation) -> Result<Option<Conversation>> {
        let query = format!(
            "INSERT INTO conversations ({CONVERSATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Conversation>(&query)
            .bind(conv.id)
            .bind(conv.status)
            .bind(conv.opened_at)
            .bind(conv.closed_at)
            .bind(conv.created_at)
            .bind(conv.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(created)
    }

    /// List conversations, newest first, with last message and message count.
    /// Without a limit every conversation is returned (`LIMIT NULL`).
    pub async fn list_summaries(&self, pagination: Pagination) -> Result<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT c.id, c.status, c.opened_at, c.closed_at, c.created_at, c.updated_at,
                   mc.message_count,
                   lm.id AS last_message_id,
                   lm.direction AS last_message_direction,
                   lm.content AS last_message_content,
                   lm.timestamp AS last_message_timestamp,
                   lm.created_at AS last_message_created_at
            FROM conversations c
            LEFT JOIN LATERAL (
                SELECT m.id, m.direction, m.content, m.timestamp, m.created_at
                FROM messages m
                WHERE m.conversation_id = c.id
                ORDER BY m.timestamp DESC, m.created_at DESC
                LIMIT 1
            ) lm ON TRUE
            CROSS JOIN LATERAL (
                SELECT COUNT(*) AS message_count
                FROM messages m
                WHERE m.conversation_id = c.id
            ) mc
            ORDER BY c.created_at DESC, c.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
