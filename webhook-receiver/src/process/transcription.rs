//! Post-call transcription processing.
//!
//! Extracts a [`CallReport`] from the `data` object of a
//! `post_call_transcription` event. Every nested lookup is optional: a missing
//! or mistyped field becomes `None`, and only the identifying fields
//! (`agent_id`, `conversation_id`, `status`) are required. When those are
//! absent the event is logged and left unprocessed instead of failing the
//! request.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::event::WebhookEvent;

/// Why a transcription event could not be turned into a report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptionError {
    #[error("event has no data object")]
    MissingData,
    #[error("data.{0} is missing or not a string")]
    MissingField(&'static str),
}

/// Who spoke a transcript turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRole {
    Agent,
    User,
    Other(String),
}

impl From<&str> for TurnRole {
    fn from(role: &str) -> Self {
        match role {
            "agent" => TurnRole::Agent,
            "user" => TurnRole::User,
            other => TurnRole::Other(other.to_string()),
        }
    }
}

/// One turn of the call transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTurn {
    pub role: Option<TurnRole>,
    /// Offset from the start of the call.
    pub time_in_call_secs: Option<f64>,
    /// `None` for turns that carry only tool calls.
    pub message: Option<String>,
}

/// Structured view of a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReport {
    pub agent_id: String,
    pub conversation_id: String,
    pub status: String,
    pub call_duration_secs: Option<f64>,
    pub cost: Option<f64>,
    pub transcript_summary: Option<String>,
    /// Turns in call order.
    pub transcript: Vec<TranscriptTurn>,
}

/// Result of the transcription path. Both variants acknowledge the webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionOutcome {
    Processed(CallReport),
    Unprocessed { reason: TranscriptionError },
}

/// Process a `post_call_transcription` event.
pub fn process_transcription(event: &WebhookEvent) -> TranscriptionOutcome {
    match extract_call_report(event) {
        Ok(report) => {
            log_call_report(&report);
            TranscriptionOutcome::Processed(report)
        }
        Err(reason) => {
            warn!(
                event_type = event.event_type.as_str(),
                reason = %reason,
                "transcription_unprocessed"
            );
            TranscriptionOutcome::Unprocessed { reason }
        }
    }
}

/// Extract a call report from the event's `data` object.
pub fn extract_call_report(event: &WebhookEvent) -> Result<CallReport, TranscriptionError> {
    let data = event
        .data()
        .filter(|d| d.is_object())
        .ok_or(TranscriptionError::MissingData)?;

    let required = |field: &'static str| {
        str_at(data, &[field])
            .map(str::to_string)
            .ok_or(TranscriptionError::MissingField(field))
    };

    let agent_id = required("agent_id")?;
    let conversation_id = required("conversation_id")?;
    let status = required("status")?;

    let transcript = data
        .get("transcript")
        .and_then(Value::as_array)
        .map(|turns| turns.iter().filter_map(TranscriptTurn::from_value).collect())
        .unwrap_or_default();

    Ok(CallReport {
        agent_id,
        conversation_id,
        status,
        call_duration_secs: f64_at(data, &["metadata", "call_duration_secs"]),
        cost: f64_at(data, &["metadata", "cost"]),
        transcript_summary: str_at(data, &["analysis", "transcript_summary"]).map(str::to_string),
        transcript,
    })
}

impl TranscriptTurn {
    /// Returns `None` when the turn is not a JSON object.
    fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            warn!("transcription_turn_not_an_object");
            return None;
        }

        Some(Self {
            role: str_at(value, &["role"]).map(TurnRole::from),
            time_in_call_secs: f64_at(value, &["time_in_call_secs"]),
            message: str_at(value, &["message"]).map(str::to_string),
        })
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

fn f64_at(value: &Value, path: &[&str]) -> Option<f64> {
    lookup(value, path).and_then(Value::as_f64)
}

fn log_call_report(report: &CallReport) {
    info!(
        agent_id = %report.agent_id,
        conversation_id = %report.conversation_id,
        status = %report.status,
        call_duration_secs = ?report.call_duration_secs,
        cost = ?report.cost,
        has_summary = report.transcript_summary.is_some(),
        turns = report.transcript.len(),
        "transcription_processed"
    );

    debug!(
        conversation_id = %report.conversation_id,
        transcript_summary = report.transcript_summary.as_deref().unwrap_or(""),
        "transcription_summary"
    );

    for (index, turn) in report.transcript.iter().enumerate() {
        let speaker = match &turn.role {
            Some(TurnRole::Agent) => "agent",
            Some(TurnRole::User) => "user",
            Some(TurnRole::Other(role)) => role.as_str(),
            None => "unknown",
        };
        debug!(
            conversation_id = %report.conversation_id,
            turn = index,
            speaker = speaker,
            time_in_call_secs = ?turn.time_in_call_secs,
            message = turn.message.as_deref().unwrap_or(""),
            "transcription_turn"
        );
    }
}
