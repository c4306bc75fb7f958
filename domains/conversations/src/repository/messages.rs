//! Message repository

use crate::domain::entities::Message;
use helpdesk_common::Result;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, conversation_id, direction, content, timestamp, created_at";

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List messages for a conversation, ordered by timestamp ASC
    pub async fn list_by_conversation(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 \
             ORDER BY timestamp ASC, created_at ASC"
        );
        let messages = sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(messages)
    }
}
