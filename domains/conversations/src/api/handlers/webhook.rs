//! Webhook ingestion handler

use axum::{extract::State, http::StatusCode, Json};
use helpdesk_common::{JsonBody, Result};
use serde::Serialize;
use tracing::warn;

use crate::api::middleware::ConversationsState;
use crate::domain::events::{EventType, WebhookEnvelope};

/// Body returned when an event was applied
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub status: &'static str,
}

impl SuccessResponse {
    fn success() -> Self {
        Self { status: "success" }
    }
}

/// Status code for an applied event: closing updates, everything else creates
fn success_status(event_type: EventType) -> StatusCode {
    match event_type {
        EventType::NewConversation | EventType::NewMessage => StatusCode::CREATED,
        EventType::CloseConversation => StatusCode::OK,
    }
}

/// Receive a chat lifecycle event
pub async fn receive_event(
    State(state): State<ConversationsState>,
    JsonBody(envelope): JsonBody<WebhookEnvelope>,
) -> Result<(StatusCode, Json<SuccessResponse>)> {
    let event = state.validator.validate(envelope).map_err(|e| {
        warn!(error = %e, "Rejected webhook event");
        e
    })?;
    let event_type = event.event_type();

    let outcome = state.dispatcher.dispatch(event).await?;
    Result::<()>::from(outcome)?;

    Ok((success_status(event_type), Json(SuccessResponse::success())))
}
