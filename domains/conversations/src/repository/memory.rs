//! In-memory conversation store
//!
//! Implements `ConversationStore` over hash maps guarded by a single async
//! mutex. The lock is held across each check-and-write, which gives the same
//! serialization per conversation as the row lock in Postgres. Used by tests
//! and local experiments without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_common::{Error, Pagination, Result};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ConversationStore, CONVERSATION_EXISTS, CONVERSATION_NOT_FOUND, MESSAGE_EXISTS};
use crate::domain::entities::{Conversation, ConversationDetail, ConversationSummary, Message};

#[derive(Debug, Default)]
struct Tables {
    conversations: HashMap<Uuid, Conversation>,
    messages: HashMap<Uuid, Message>,
}

impl Tables {
    fn messages_of(&self, conversation_id: Uuid) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.created_at.cmp(&b.created_at))
        });
        messages
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    tables: Mutex<Tables>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations
    pub async fn conversation_count(&self) -> usize {
        self.tables.lock().await.conversations.len()
    }

    /// Number of stored messages across all conversations
    pub async fn message_count(&self) -> usize {
        self.tables.lock().await.messages.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create_conversation(&self, conv: &Conversation) -> Result<Conversation> {
        let mut tables = self.tables.lock().await;
        if tables.conversations.contains_key(&conv.id) {
            return Err(Error::Conflict(CONVERSATION_EXISTS.to_string()));
        }
        tables.conversations.insert(conv.id, conv.clone());
        Ok(conv.clone())
    }

    async fn add_message(&self, msg: &Message) -> Result<Message> {
        let mut tables = self.tables.lock().await;

        let conv = tables
            .conversations
            .get(&msg.conversation_id)
            .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))?;
        conv.accept_message()?;

        if tables.messages.contains_key(&msg.id) {
            return Err(Error::Conflict(MESSAGE_EXISTS.to_string()));
        }
        tables.messages.insert(msg.id, msg.clone());
        Ok(msg.clone())
    }

    async fn close_conversation(
        &self,
        id: Uuid,
        closed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Conversation> {
        let mut tables = self.tables.lock().await;

        let conv = tables
            .conversations
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))?;

        // Work on a copy so a rejected transition leaves the stored row untouched
        let mut updated = conv.clone();
        updated.close(closed_at, now)?;
        *conv = updated.clone();

        Ok(updated)
    }

    async fn list_conversations(&self, pagination: Pagination) -> Result<Vec<ConversationSummary>> {
        let tables = self.tables.lock().await;

        let mut conversations: Vec<&Conversation> = tables.conversations.values().collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let offset = usize::try_from(pagination.offset()).unwrap_or(0);
        let limit = pagination
            .limit()
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(0));

        let summaries = conversations
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|conv| {
                let messages = tables.messages_of(conv.id);
                ConversationSummary {
                    conversation: conv.clone(),
                    message_count: messages.len() as i64,
                    last_message: messages.into_iter().max_by(|a, b| {
                        a.timestamp
                            .cmp(&b.timestamp)
                            .then(a.created_at.cmp(&b.created_at))
                    }),
                }
            })
            .collect();

        Ok(summaries)
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<ConversationDetail>> {
        let tables = self.tables.lock().await;

        Ok(tables.conversations.get(&id).map(|conv| ConversationDetail {
            conversation: conv.clone(),
            messages: tables.messages_of(id),
        }))
    }
}
