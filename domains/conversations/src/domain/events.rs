//! Webhook event envelope and its validation
//!
//! An inbound envelope `{type, timestamp, data}` is checked in two steps.
//! First the envelope itself (`type` and `data` present and well-formed) and
//! the timestamp (parseable and not in the future), reported together. Then
//! `data` against the payload schema selected by `type`. The result is a
//! `WebhookEvent`, a sum type with one variant per event kind.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use helpdesk_common::{Clock, Error, FieldErrors};

use crate::domain::entities::MessageDirection;

const REQUIRED: &str = "This field is required.";
const INVALID_UUID: &str = "Invalid UUID format.";
const INVALID_DIRECTION: &str = "Direction must be 'SENT' or 'RECEIVED'.";
const EMPTY_CONTENT: &str = "Content cannot be empty.";
const FUTURE_TIMESTAMP: &str = "Timestamp cannot be in the future.";

/// Declared event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    NewConversation,
    NewMessage,
    CloseConversation,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::NewConversation => write!(f, "NEW_CONVERSATION"),
            EventType::NewMessage => write!(f, "NEW_MESSAGE"),
            EventType::CloseConversation => write!(f, "CLOSE_CONVERSATION"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW_CONVERSATION" => Ok(EventType::NewConversation),
            "NEW_MESSAGE" => Ok(EventType::NewMessage),
            "CLOSE_CONVERSATION" => Ok(EventType::CloseConversation),
            other => Err(format!("'{}' is not a valid event type.", other)),
        }
    }
}

/// Raw webhook envelope as received on the wire.
///
/// Every field is optional and untyped so that a bad envelope yields field
/// errors rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type", default)]
    pub event_type: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// `data` for NEW_CONVERSATION and CLOSE_CONVERSATION
#[derive(Debug, Deserialize, Validate)]
pub struct ConversationRefPayload {
    #[validate(required(message = "This field is required."), custom(function = "validate_uuid"))]
    pub id: Option<Value>,
}

/// `data` for NEW_MESSAGE
#[derive(Debug, Deserialize, Validate)]
pub struct NewMessagePayload {
    #[validate(required(message = "This field is required."), custom(function = "validate_uuid"))]
    pub id: Option<Value>,

    #[validate(
        required(message = "This field is required."),
        custom(function = "validate_direction")
    )]
    pub direction: Option<Value>,

    #[validate(
        required(message = "This field is required."),
        custom(function = "validate_content")
    )]
    pub content: Option<Value>,

    #[validate(required(message = "This field is required."), custom(function = "validate_uuid"))]
    pub conversation_id: Option<Value>,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_uuid(value: &Value) -> Result<(), ValidationError> {
    match value.as_str().map(Uuid::parse_str) {
        Some(Ok(_)) => Ok(()),
        _ => Err(field_error("uuid", INVALID_UUID)),
    }
}

fn validate_direction(value: &Value) -> Result<(), ValidationError> {
    match value.as_str().map(str::parse::<MessageDirection>) {
        Some(Ok(_)) => Ok(()),
        _ => Err(field_error("direction", INVALID_DIRECTION)),
    }
}

fn validate_content(value: &Value) -> Result<(), ValidationError> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(field_error("content", EMPTY_CONTENT)),
    }
}

/// A validated, typed webhook event
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    NewConversation {
        id: Uuid,
        timestamp: DateTime<Utc>,
    },
    NewMessage {
        id: Uuid,
        conversation_id: Uuid,
        direction: MessageDirection,
        content: String,
        timestamp: DateTime<Utc>,
    },
    CloseConversation {
        id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl WebhookEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            WebhookEvent::NewConversation { .. } => EventType::NewConversation,
            WebhookEvent::NewMessage { .. } => EventType::NewMessage,
            WebhookEvent::CloseConversation { .. } => EventType::CloseConversation,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            WebhookEvent::NewConversation { timestamp, .. }
            | WebhookEvent::NewMessage { timestamp, .. }
            | WebhookEvent::CloseConversation { timestamp, .. } => *timestamp,
        }
    }

    /// Conversation the event acts on
    pub fn conversation_id(&self) -> Uuid {
        match self {
            WebhookEvent::NewConversation { id, .. }
            | WebhookEvent::CloseConversation { id, .. } => *id,
            WebhookEvent::NewMessage {
                conversation_id, ..
            } => *conversation_id,
        }
    }
}

/// Validation failures, grouped by the stage that rejected the envelope
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(FieldErrors),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(FieldErrors),
}

impl EventError {
    /// Field -> reason map for the response body
    pub fn fields(&self) -> FieldErrors {
        match self {
            EventError::InvalidEnvelope(fields) | EventError::InvalidPayload(fields) => {
                fields.clone()
            }
            EventError::InvalidTimestamp(reason) => FieldErrors::single("timestamp", reason.clone()),
        }
    }
}

impl From<EventError> for Error {
    fn from(err: EventError) -> Self {
        let message = match err {
            EventError::InvalidEnvelope(_) => "Invalid envelope",
            EventError::InvalidTimestamp(_) => "Invalid timestamp",
            EventError::InvalidPayload(_) => "Invalid payload",
        };
        Error::InvalidFields {
            message: message.to_string(),
            fields: err.fields(),
        }
    }
}

/// ISO-8601 layouts carrying an offset (`Z`, `+02`, `+0200` or `+02:00`)
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// ISO-8601 layouts without an offset
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp. Seconds are optional and the date and time
/// may be separated by `T` or a space. Offsets are normalized to UTC; naive
/// timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
}

/// Validates webhook envelopes against the clock it was built with
#[derive(Clone)]
pub struct EventValidator {
    clock: Arc<dyn Clock>,
}

impl EventValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Validate an envelope into a typed event
    pub fn validate(&self, envelope: WebhookEnvelope) -> Result<WebhookEvent, EventError> {
        let envelope_check = Self::check_envelope(&envelope);
        let timestamp_check = self.check_timestamp(envelope.timestamp.as_ref());

        let (event_type, data) = match envelope_check {
            Ok(checked) => checked,
            Err(mut fields) => {
                if let Err(reason) = &timestamp_check {
                    fields.insert("timestamp", reason.clone());
                }
                return Err(EventError::InvalidEnvelope(fields));
            }
        };
        let timestamp = timestamp_check.map_err(EventError::InvalidTimestamp)?;

        match event_type {
            EventType::NewConversation => {
                let id = Self::conversation_ref(data)?;
                Ok(WebhookEvent::NewConversation { id, timestamp })
            }
            EventType::CloseConversation => {
                let id = Self::conversation_ref(data)?;
                Ok(WebhookEvent::CloseConversation { id, timestamp })
            }
            EventType::NewMessage => {
                let payload = Self::payload::<NewMessagePayload>(data)?;
                let id = uuid_of(&payload.id, "data.id")?;
                let conversation_id = uuid_of(&payload.conversation_id, "data.conversation_id")?;
                let direction = payload
                    .direction
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<MessageDirection>().ok())
                    .ok_or_else(|| {
                        EventError::InvalidPayload(FieldErrors::single(
                            "data.direction",
                            INVALID_DIRECTION,
                        ))
                    })?;
                let content = payload
                    .content
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        EventError::InvalidPayload(FieldErrors::single(
                            "data.content",
                            EMPTY_CONTENT,
                        ))
                    })?;

                Ok(WebhookEvent::NewMessage {
                    id,
                    conversation_id,
                    direction,
                    content,
                    timestamp,
                })
            }
        }
    }

    fn check_envelope(envelope: &WebhookEnvelope) -> Result<(EventType, &Value), FieldErrors> {
        let mut errors = FieldErrors::new();

        let event_type = match envelope.event_type.as_ref() {
            None | Some(Value::Null) => {
                errors.insert("type", REQUIRED);
                None
            }
            Some(Value::String(raw)) => match raw.parse::<EventType>() {
                Ok(t) => Some(t),
                Err(reason) => {
                    errors.insert("type", reason);
                    None
                }
            },
            Some(_) => {
                errors.insert("type", "Must be a string.");
                None
            }
        };

        let data = match envelope.data.as_ref() {
            None | Some(Value::Null) => {
                errors.insert("data", REQUIRED);
                None
            }
            Some(v @ Value::Object(_)) => Some(v),
            Some(_) => {
                errors.insert("data", "Must be an object.");
                None
            }
        };

        match (event_type, data) {
            (Some(t), Some(d)) => Ok((t, d)),
            _ => Err(errors),
        }
    }

    fn check_timestamp(&self, raw: Option<&Value>) -> Result<DateTime<Utc>, String> {
        let raw = match raw {
            None | Some(Value::Null) => return Err(REQUIRED.to_string()),
            Some(Value::String(s)) => s,
            Some(_) => return Err("Timestamp must be an ISO-8601 string.".to_string()),
        };

        let timestamp = parse_timestamp(raw)
            .ok_or_else(|| format!("'{}' is not a valid ISO-8601 datetime.", raw))?;

        if timestamp > self.clock.now() {
            return Err(FUTURE_TIMESTAMP.to_string());
        }

        Ok(timestamp)
    }

    fn conversation_ref(data: &Value) -> Result<Uuid, EventError> {
        let payload = Self::payload::<ConversationRefPayload>(data)?;
        uuid_of(&payload.id, "data.id")
    }

    fn payload<T>(data: &Value) -> Result<T, EventError>
    where
        T: serde::de::DeserializeOwned + Validate,
    {
        let payload: T = serde_json::from_value(data.clone()).map_err(|e| {
            EventError::InvalidEnvelope(FieldErrors::single("data", e.to_string()))
        })?;
        payload
            .validate()
            .map_err(|e| EventError::InvalidPayload(FieldErrors::from_validation("data", &e)))?;
        Ok(payload)
    }
}

fn uuid_of(value: &Option<Value>, field: &str) -> Result<Uuid, EventError> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| EventError::InvalidPayload(FieldErrors::single(field, INVALID_UUID)))
}
