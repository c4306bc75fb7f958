//! Event dispatcher
//!
//! Routes a validated `WebhookEvent` to the matching store transition and
//! classifies the result as an `Outcome`. Infrastructure failures are
//! returned as errors and never folded into an outcome.

use std::sync::Arc;

use helpdesk_common::{Clock, Error, Result};
use tracing::{info, instrument, warn};

use crate::domain::entities::{Conversation, Message};
use crate::domain::events::WebhookEvent;
use crate::repository::ConversationStore;

/// How an event was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transition was applied
    Created,
    /// The event reuses an id that already exists
    Conflict(String),
    /// The referenced conversation does not exist
    NotFound(String),
    /// The state machine refused the transition
    Rejected(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Created)
    }
}

/// Reused ids and refused transitions both answer 400 with the reason
impl From<Outcome> for Result<()> {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Created => Ok(()),
            Outcome::Conflict(reason) | Outcome::Rejected(reason) => {
                Err(Error::InvalidState(reason))
            }
            Outcome::NotFound(reason) => Err(Error::NotFound(reason)),
        }
    }
}

#[derive(Clone)]
pub struct EventDispatcher {
    store: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
}

impl EventDispatcher {
    pub fn new(store: Arc<dyn ConversationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Apply a validated event
    #[instrument(skip(self, event), fields(event_type = %event.event_type(), conversation_id = %event.conversation_id()))]
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<Outcome> {
        let now = self.clock.now();

        let applied = match event {
            WebhookEvent::NewConversation { id, timestamp } => self
                .store
                .create_conversation(&Conversation::open(id, timestamp, now))
                .await
                .map(|_| ()),
            WebhookEvent::NewMessage {
                id,
                conversation_id,
                direction,
                content,
                timestamp,
            } => {
                let message = Message::new(id, conversation_id, direction, content, timestamp, now)?;
                self.store.add_message(&message).await.map(|_| ())
            }
            WebhookEvent::CloseConversation { id, timestamp } => self
                .store
                .close_conversation(id, timestamp, now)
                .await
                .map(|_| ()),
        };

        let outcome = match applied {
            Ok(()) => Outcome::Created,
            Err(Error::Conflict(reason)) => Outcome::Conflict(reason),
            Err(Error::NotFound(reason)) => Outcome::NotFound(reason),
            Err(Error::InvalidState(reason)) => Outcome::Rejected(reason),
            Err(other) => return Err(other),
        };

        if outcome.is_success() {
            info!("Event applied");
        } else {
            warn!(outcome = ?outcome, "Event not applied");
        }

        Ok(outcome)
    }
}
