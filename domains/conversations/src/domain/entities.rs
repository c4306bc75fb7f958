//! Domain entities for the Conversations domain
//!
//! Conversations and messages are identified by ids assigned by the webhook
//! sender. Timestamps named after events (`opened_at`, `closed_at`,
//! `timestamp`) are caller-supplied; `created_at` / `updated_at` are set by
//! the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use helpdesk_common::{Error, Result};

use crate::domain::state::{
    ConversationEvent, ConversationState, ConversationStateMachine, StateError,
};

/// Reason reported for a message sent to a closed conversation
pub const CLOSED_CONVERSATION_MESSAGE: &str = "cannot add messages to a closed conversation";

/// Reason reported when closing an already closed conversation
pub const ALREADY_CLOSED: &str = "conversation already closed";

/// Conversation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "conversation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationStatus {
    #[default]
    Open,
    Closed,
}

impl ConversationStatus {
    /// Convert to state machine state
    pub fn to_state(self) -> ConversationState {
        match self {
            ConversationStatus::Open => ConversationState::Open,
            ConversationStatus::Closed => ConversationState::Closed,
        }
    }

    /// Create from state machine state
    pub fn from_state(state: ConversationState) -> Self {
        match state {
            ConversationState::Open => ConversationStatus::Open,
            ConversationState::Closed => ConversationStatus::Closed,
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationStatus::Open => write!(f, "OPEN"),
            ConversationStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Message direction, from the support agent's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_direction", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageDirection {
    Sent,
    Received,
}

impl std::fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageDirection::Sent => write!(f, "SENT"),
            MessageDirection::Received => write!(f, "RECEIVED"),
        }
    }
}

impl std::str::FromStr for MessageDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SENT" => Ok(MessageDirection::Sent),
            "RECEIVED" => Ok(MessageDirection::Received),
            other => Err(Error::Validation(format!(
                "Direction must be 'SENT' or 'RECEIVED', got '{}'",
                other
            ))),
        }
    }
}

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub status: ConversationStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Open a new conversation. `now` is the bookkeeping time of the write.
    pub fn open(id: Uuid, opened_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Conversation {
            id,
            status: ConversationStatus::default(),
            opened_at,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == ConversationStatus::Closed
    }

    /// Check that a message may be appended to this conversation
    pub fn accept_message(&self) -> Result<()> {
        self.apply_transition(ConversationEvent::ReceiveMessage)?;
        Ok(())
    }

    /// Close the conversation at the caller-supplied `closed_at`
    pub fn close(&mut self, closed_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        let new_state = self.apply_transition(ConversationEvent::Close)?;
        self.status = ConversationStatus::from_state(new_state);
        self.closed_at = Some(closed_at);
        self.updated_at = now;
        Ok(())
    }

    /// Apply a state transition using the state machine
    fn apply_transition(&self, event: ConversationEvent) -> Result<ConversationState> {
        ConversationStateMachine::transition(self.status.to_state(), event).map_err(
            |StateError::TerminalState(_)| Error::InvalidState(event.rejection().to_string()),
        )
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub direction: MessageDirection,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(
        id: Uuid,
        conversation_id: Uuid,
        direction: MessageDirection,
        content: String,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Self::validate_content(&content)?;

        Ok(Message {
            id,
            conversation_id,
            direction,
            content,
            timestamp,
            created_at: now,
        })
    }

    /// Validate message content (CHECK (length(trim(content)) > 0))
    fn validate_content(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::Validation("Content cannot be empty.".to_string()));
        }
        Ok(())
    }
}

/// List projection row: a conversation with its latest message and count
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub message_count: i64,
}

/// Detail projection: a conversation with all of its messages
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}
