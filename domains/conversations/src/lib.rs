//! Conversations domain: support chat webhook ingestion and read projections

pub mod api;
pub mod dispatcher;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{
    Conversation, ConversationDetail, ConversationStatus, ConversationSummary, Message,
    MessageDirection,
};
pub use domain::events::{EventError, EventType, EventValidator, WebhookEnvelope, WebhookEvent};
pub use domain::state::{
    ConversationEvent, ConversationState, ConversationStateMachine, StateError,
};

pub use dispatcher::{EventDispatcher, Outcome};

// Re-export repository types
pub use repository::{
    ConversationRepository, ConversationStore, ConversationsRepositories,
    InMemoryConversationStore, MessageRepository,
};

// Re-export API types
pub use api::routes;
pub use api::ConversationsState;
