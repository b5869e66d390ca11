//! Web server module for handling inbound ElevenLabs webhooks.
//!
//! This module provides a thin web server that:
//! - Receives post-call webhooks from ElevenLabs
//! - Verifies the HMAC signature when a secret is configured
//! - Dispatches the payload on its event type
//! - Answers with `{"status":"received"}`, 401 or 422
//!
//! # Endpoints
//!
//! - `POST /webhooks/holly-conversation` - ElevenLabs conversation webhook
//! - `GET /health` - Liveness check
//! - `GET /` - Service index

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, holly_conversation_webhook, index, AppState, ErrorResponse, HealthResponse,
    IndexResponse, WebhookError, WebhookResponse, HEALTH_PATH, HOLLY_CONVERSATION_PATH,
    SERVICE_NAME,
};
pub use signature::{
    compute_elevenlabs_signature, format_signature_header, is_signature_verification_enabled,
    verify_elevenlabs_signature, verify_elevenlabs_signature_at, SignatureRejection,
    VerificationResult, SIGNATURE_HEADER, TIMESTAMP_TOLERANCE_SECS,
};

/// Build the axum router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route(HEALTH_PATH, get(health))
        .route(HOLLY_CONVERSATION_PATH, post(holly_conversation_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
