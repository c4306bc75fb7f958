//! Route definitions for Conversations domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{conversations, webhook};
use super::middleware::ConversationsState;

/// Webhook ingestion route
fn webhook_routes() -> Router<ConversationsState> {
    Router::new()
        .route("/webhook", post(webhook::receive_event))
        .route("/webhook/", post(webhook::receive_event))
}

/// Read-only conversation routes
fn conversation_routes() -> Router<ConversationsState> {
    Router::new()
        .route("/conversations", get(conversations::list_conversations))
        .route("/conversations/", get(conversations::list_conversations))
        .route("/conversations/{id}", get(conversations::get_conversation))
        .route("/conversations/{id}/", get(conversations::get_conversation))
}

/// Create all Conversations domain API routes
pub fn routes() -> Router<ConversationsState> {
    Router::new()
        .merge(webhook_routes())
        .merge(conversation_routes())
}
