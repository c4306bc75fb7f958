//! Conversations domain state

use std::sync::Arc;

use helpdesk_common::Clock;

use crate::dispatcher::EventDispatcher;
use crate::domain::events::EventValidator;
use crate::repository::ConversationStore;

/// Application state for the Conversations domain
#[derive(Clone)]
pub struct ConversationsState {
    pub store: Arc<dyn ConversationStore>,
    pub validator: EventValidator,
    pub dispatcher: EventDispatcher,
}

impl ConversationsState {
    /// Wire the validator and dispatcher to one store and one clock
    pub fn new(store: Arc<dyn ConversationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            validator: EventValidator::new(clock.clone()),
            dispatcher: EventDispatcher::new(store.clone(), clock),
            store,
        }
    }
}
