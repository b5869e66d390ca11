//! Webhook event envelope.
//!
//! ElevenLabs wraps every webhook in the same envelope:
//!
//! ```json
//! { "type": "post_call_transcription", "event_timestamp": 1739537297, "data": { ... } }
//! ```
//!
//! Only `type` is required here. Everything else is kept as raw JSON for the
//! event-specific processing path.

use serde_json::{Map, Value};

/// Event type string for completed-call transcripts.
pub const POST_CALL_TRANSCRIPTION: &str = "post_call_transcription";

/// Dispatch discriminator taken from the `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    PostCallTranscription,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::PostCallTranscription => POST_CALL_TRANSCRIPTION,
            EventType::Other(name) => name,
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            POST_CALL_TRANSCRIPTION => EventType::PostCallTranscription,
            other => EventType::Other(other.to_string()),
        }
    }
}

/// A parsed webhook payload.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_type: EventType,
    /// Unix seconds at which ElevenLabs emitted the event, when present.
    pub event_timestamp: Option<i64>,
    /// The full top-level JSON object, `type` included.
    pub payload: Map<String, Value>,
}

impl WebhookEvent {
    /// Build an event from a parsed JSON value.
    ///
    /// Returns `None` unless the value is an object with a string `type`.
    pub fn from_value(value: Value) -> Option<Self> {
        let payload = match value {
            Value::Object(map) => map,
            _ => return None,
        };

        let event_type = EventType::from(payload.get("type")?.as_str()?);
        let event_timestamp = payload.get("event_timestamp").and_then(Value::as_i64);

        Some(Self {
            event_type,
            event_timestamp,
            payload,
        })
    }

    /// The `data` object, if the payload carries one.
    pub fn data(&self) -> Option<&Value> {
        self.payload.get("data")
    }
}
