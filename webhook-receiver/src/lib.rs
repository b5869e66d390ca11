//! Holly - ElevenLabs conversation webhook receiver.
//!
//! Accepts signed post-call webhooks from ElevenLabs for the Holly voice
//! agent, verifies their HMAC signature and dispatches them on event type.
//!
//! ## Architecture
//!
//! ```text
//! POST /webhooks/holly-conversation → signature::verify → process::dispatch → 200 / 401 / 422
//! ```

pub mod config;
pub mod event;
pub mod process;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use event::{EventType, WebhookEvent};
pub use process::{dispatch, DispatchOutcome, DispatchRejection, Dispatched};
pub use web::{build_router, AppState};
