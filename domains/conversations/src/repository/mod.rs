//! Repository implementations for the Conversations domain
//!
//! `ConversationStore` is the persistence contract used by the dispatcher and
//! the read endpoints. Each state-changing method performs the state check and
//! the write as one atomic unit.

pub mod conversations;
pub mod memory;
pub mod messages;
pub mod transactions;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_common::{db::is_unique_violation, Error, Pagination, RepositoryError, Result};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::entities::{Conversation, ConversationDetail, ConversationSummary, Message};

pub use conversations::ConversationRepository;
pub use memory::InMemoryConversationStore;
pub use messages::MessageRepository;
use transactions::{insert_message_tx, lock_conversation_tx, update_conversation_tx};

/// Reason reported when a NEW_CONVERSATION reuses an existing id
pub const CONVERSATION_EXISTS: &str = "conversation already exists";

/// Reason reported when a NEW_MESSAGE reuses an existing message id
pub const MESSAGE_EXISTS: &str = "message already exists";

/// Reason reported when an event references an unknown conversation
pub const CONVERSATION_NOT_FOUND: &str = "conversation not found";

/// Persistence contract for conversations and their messages
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert a new conversation; `Error::Conflict` if the id exists
    async fn create_conversation(&self, conv: &Conversation) -> Result<Conversation>;

    /// Append a message; `Error::NotFound` for an unknown conversation,
    /// `Error::InvalidState` if it is closed, `Error::Conflict` for a reused id
    async fn add_message(&self, msg: &Message) -> Result<Message>;

    /// Close a conversation; `Error::NotFound` or `Error::InvalidState`
    async fn close_conversation(
        &self,
        id: Uuid,
        closed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Conversation>;

    /// Conversations by `created_at` descending with their latest message
    async fn list_conversations(&self, pagination: Pagination) -> Result<Vec<ConversationSummary>>;

    /// A conversation with all of its messages
    async fn find_conversation(&self, id: Uuid) -> Result<Option<ConversationDetail>>;
}

/// Combined repository access for the Conversations domain
#[derive(Clone)]
pub struct ConversationsRepositories {
    pool: PgPool,
    pub conversations: ConversationRepository,
    pub messages: MessageRepository,
}

impl ConversationsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            conversations: ConversationRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            pool,
        }
    }

    /// Begin a new database transaction.
    pub async fn begin(&self) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}

#[async_trait]
impl ConversationStore for ConversationsRepositories {
    #[instrument(skip(self, conv), fields(conversation_id = %conv.id))]
    async fn create_conversation(&self, conv: &Conversation) -> Result<Conversation> {
        self.conversations
            .create_if_absent(conv)
            .await?
            .ok_or_else(|| RepositoryError::AlreadyExists(CONVERSATION_EXISTS.to_string()).into())
    }

    #[instrument(skip(self, msg), fields(conversation_id = %msg.conversation_id, message_id = %msg.id))]
    async fn add_message(&self, msg: &Message) -> Result<Message> {
        let mut tx = self.begin().await?;

        let conv = lock_conversation_tx(&mut tx, msg.conversation_id)
            .await?
            .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))?;
        conv.accept_message()?;

        let created = insert_message_tx(&mut tx, msg).await.map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::AlreadyExists(MESSAGE_EXISTS.to_string())
            } else {
                RepositoryError::Connection(e)
            }
        })?;
        tx.commit().await?;

        Ok(created)
    }

    #[instrument(skip(self), fields(conversation_id = %id))]
    async fn close_conversation(
        &self,
        id: Uuid,
        closed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Conversation> {
        let mut tx = self.begin().await?;

        let mut conv = lock_conversation_tx(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))?;
        conv.close(closed_at, now)?;

        let updated = update_conversation_tx(&mut tx, &conv).await?;
        tx.commit().await?;

        Ok(updated)
    }

    async fn list_conversations(&self, pagination: Pagination) -> Result<Vec<ConversationSummary>> {
        self.conversations.list_summaries(pagination).await
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<ConversationDetail>> {
        let Some(conversation) = self.conversations.find(id).await? else {
            return Ok(None);
        };
        let messages = self.messages.list_by_conversation(id).await?;

        Ok(Some(ConversationDetail {
            conversation,
            messages,
        }))
    }
}
