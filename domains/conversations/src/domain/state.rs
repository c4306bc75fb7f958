//! State machine for conversation status transitions
//!
//! Conversation states: Open → Closed (Closed is terminal)

pub use helpdesk_common::StateError;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{ALREADY_CLOSED, CLOSED_CONVERSATION_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationState {
    Open,
    Closed,
}

impl ConversationState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Events that act on an existing conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A message is appended; the conversation stays open
    ReceiveMessage,
    /// The conversation is closed
    Close,
}

impl ConversationEvent {
    /// Reason reported when the event targets a closed conversation
    pub fn rejection(&self) -> &'static str {
        match self {
            Self::ReceiveMessage => CLOSED_CONVERSATION_MESSAGE,
            Self::Close => ALREADY_CLOSED,
        }
    }
}

/// Conversation state machine
pub struct ConversationStateMachine;

impl ConversationStateMachine {
    /// Attempt a state transition
    pub fn transition(
        current: ConversationState,
        event: ConversationEvent,
    ) -> Result<ConversationState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        // Only Open remains
        let next = match event {
            ConversationEvent::ReceiveMessage => ConversationState::Open,
            ConversationEvent::Close => ConversationState::Closed,
        };

        Ok(next)
    }
}
