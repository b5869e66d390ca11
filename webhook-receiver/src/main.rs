//! Holly webhook server - receives ElevenLabs post-call webhooks.
//!
//! This binary provides a thin web server that:
//! - Verifies `elevenlabs-signature` headers when a secret is configured
//! - Parses and dispatches conversation events
//! - Logs completed-call transcripts

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use holly::web::is_signature_verification_enabled;
use holly::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Only DEBUG is read up front; it picks the default log level
    let default_level = if Config::debug_flag_from_env() {
        "debug"
    } else {
        "info"
    };

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration from environment
    let config = Config::from_env();

    let verification_enabled =
        is_signature_verification_enabled(&config.elevenlabs_webhook_secret);
    info!(
        app_name = %config.app_name,
        app_version = %config.app_version,
        port = config.port,
        debug = config.debug,
        signature_verification = verification_enabled,
        "config_loaded"
    );

    if !verification_enabled {
        warn!("elevenlabs_webhook_secret_not_configured_accepting_unsigned_webhooks");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = build_router(AppState::new(config));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
