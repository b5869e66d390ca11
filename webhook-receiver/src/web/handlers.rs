//! HTTP endpoint handlers.
//!
//! The webhook handler is the only one with real work to do:
//! 1. Verify the `elevenlabs-signature` header (if a secret is configured)
//! 2. Dispatch the raw body on its event type
//! 3. Map the outcome to a status code

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::process::{dispatch, DispatchRejection, Dispatched, TranscriptionOutcome};
use crate::web::signature::{
    is_signature_verification_enabled, verify_elevenlabs_signature, SignatureRejection,
    SIGNATURE_HEADER,
};
use crate::Config;

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "holly-and-morty-api";

/// Path of the ElevenLabs conversation webhook.
pub const HOLLY_CONVERSATION_PATH: &str = "/webhooks/holly-conversation";

/// Path of the health check.
pub const HEALTH_PATH: &str = "/health";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The webhook secret, if verification is enabled.
    pub fn webhook_secret(&self) -> Option<&str> {
        if is_signature_verification_enabled(&self.config.elevenlabs_webhook_secret) {
            self.config.elevenlabs_webhook_secret.as_deref()
        } else {
            None
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors returned by the webhook endpoint.
///
/// Messages are short and never include the payload, the secret, or the
/// expected signature.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{0}")]
    Unauthorized(#[from] SignatureRejection),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] DispatchRejection),
}

/// Error body, shaped like FastAPI's `HTTPException` responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Health Check and Index
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// Webhook endpoint paths listed by the index.
#[derive(Serialize)]
pub struct WebhookPaths {
    pub holly_conversation: &'static str,
}

/// Index response listing the service's endpoints.
#[derive(Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
    pub health: &'static str,
    pub webhooks: WebhookPaths,
}

/// Root endpoint.
pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    Json(IndexResponse {
        message: format!("Welcome to {}", state.config.app_name),
        version: state.config.app_version.clone(),
        health: HEALTH_PATH,
        webhooks: WebhookPaths {
            holly_conversation: HOLLY_CONVERSATION_PATH,
        },
    })
}

// =============================================================================
// ElevenLabs Webhook
// =============================================================================

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// ElevenLabs conversation webhook endpoint.
///
/// The body is taken as raw bytes: the signature covers the exact bytes sent,
/// so it must not be decoded and re-encoded before verification.
pub async fn holly_conversation_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    info!(
        body_length = body.len(),
        has_signature = headers.contains_key(SIGNATURE_HEADER),
        "holly_webhook_received"
    );

    if let Some(secret) = state.webhook_secret() {
        let signature_header = match headers.get(SIGNATURE_HEADER) {
            Some(value) => match value.to_str() {
                Ok(s) => Some(s),
                Err(_) => {
                    warn!("holly_webhook_signature_not_ascii");
                    return Err(SignatureRejection::MalformedHeader.into());
                }
            },
            None => None,
        };

        verify_elevenlabs_signature(&body, signature_header, Some(secret)).into_result()?;
    }

    let dispatched = dispatch(&body).into_result()?;

    let route = match &dispatched {
        Dispatched::Transcription(TranscriptionOutcome::Processed(_)) => "transcription_processed",
        Dispatched::Transcription(TranscriptionOutcome::Unprocessed { .. }) => {
            "transcription_unprocessed"
        }
        Dispatched::Unhandled { .. } => "not_processed",
    };
    info!(route = route, "holly_webhook_acknowledged");

    Ok(Json(WebhookResponse { status: "received" }))
}
