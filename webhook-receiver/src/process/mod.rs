//! Webhook payload dispatch.
//!
//! Turns an already-authenticated raw body into a [`DispatchOutcome`].
//!
//! ## Dispatch Flow
//!
//! ```text
//! raw bytes → UTF-8 → JSON → WebhookEvent → post_call_transcription → process_transcription()
//!                                         → anything else           → logged, not processed
//! ```
//!
//! Any failure before a `type` is found is terminal and reported as a
//! [`DispatchRejection`]. Everything after that is acknowledged.

pub mod transcription;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::event::{EventType, WebhookEvent};

pub use transcription::{
    process_transcription, CallReport, TranscriptTurn, TranscriptionError, TranscriptionOutcome,
    TurnRole,
};

/// Why a payload could not be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchRejection {
    #[error("body is not valid UTF-8")]
    InvalidUtf8,
    #[error("body is not valid JSON")]
    InvalidJson,
    #[error("payload has no string \"type\" field")]
    MissingTypeField,
}

impl DispatchRejection {
    /// Short machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchRejection::InvalidUtf8 => "invalid_utf8",
            DispatchRejection::InvalidJson => "invalid_json",
            DispatchRejection::MissingTypeField => "missing_type_field",
        }
    }
}

/// Which branch handled an acknowledged event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Transcription(TranscriptionOutcome),
    Unhandled { event_type: String },
}

/// Result of dispatching a webhook body.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Acknowledged(Dispatched),
    Rejected(DispatchRejection),
}

impl DispatchOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, DispatchOutcome::Acknowledged(_))
    }

    /// Convert into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<Dispatched, DispatchRejection> {
        match self {
            DispatchOutcome::Acknowledged(dispatched) => Ok(dispatched),
            DispatchOutcome::Rejected(reason) => Err(reason),
        }
    }
}

/// Dispatch a raw webhook body on its `type` field.
pub fn dispatch(body: &[u8]) -> DispatchOutcome {
    let event = match parse_event(body) {
        Ok(event) => event,
        Err(reason) => {
            // Only the length is logged; the body may hold conversation content.
            warn!(
                reason = reason.code(),
                body_length = body.len(),
                "webhook_payload_rejected"
            );
            return DispatchOutcome::Rejected(reason);
        }
    };

    info!(
        event_type = event.event_type.as_str(),
        event_timestamp = ?event.event_timestamp,
        "webhook_routing"
    );

    let dispatched = match &event.event_type {
        EventType::PostCallTranscription => {
            Dispatched::Transcription(process_transcription(&event))
        }
        EventType::Other(event_type) => {
            info!(event_type = %event_type, "webhook_event_not_processed");
            Dispatched::Unhandled {
                event_type: event_type.clone(),
            }
        }
    };

    DispatchOutcome::Acknowledged(dispatched)
}

/// Parse a raw body into a [`WebhookEvent`].
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, DispatchRejection> {
    let text = std::str::from_utf8(body).map_err(|_| DispatchRejection::InvalidUtf8)?;

    let value: Value = serde_json::from_str(text).map_err(|e| {
        warn!(
            error = %e,
            line = e.line(),
            column = e.column(),
            "webhook_json_parse_failed"
        );
        DispatchRejection::InvalidJson
    })?;

    WebhookEvent::from_value(value).ok_or(DispatchRejection::MissingTypeField)
}
