//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. A `.env` file in the
//! working directory is loaded first when present.

use std::env;
use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service name reported by the index endpoint
    pub app_name: String,

    /// Service version reported by the index endpoint
    pub app_version: String,

    /// Enables debug-level logging (full transcripts)
    pub debug: bool,

    /// Port for the web server to listen on
    pub port: u16,

    /// ElevenLabs webhook secret for HMAC signature verification.
    /// When unset, requests are accepted without verification.
    pub elevenlabs_webhook_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app_name: "Holly and Morty API".to_string(),
            app_version: "1.0.0".to_string(),
            debug: false,
            port: 8000,
            elevenlabs_webhook_secret: None,
        }
    }
}

impl Config {
    /// Load configuration from `.env` (if present) and environment variables.
    ///
    /// Invalid values are reported with `warn!`, so the tracing subscriber
    /// should be installed before calling this.
    pub fn from_env() -> Self {
        load_dotenv();
        Self::from_vars()
    }

    /// Read the `DEBUG` flag without logging.
    ///
    /// Used to pick the default log level before the subscriber exists.
    /// Invalid values read as `false` here and are reported later by
    /// [`Config::from_env`].
    pub fn debug_flag_from_env() -> bool {
        load_dotenv();
        env::var("DEBUG")
            .ok()
            .and_then(|raw| parse_bool_value(&raw))
            .unwrap_or(false)
    }

    /// Load configuration from the process environment only.
    fn from_vars() -> Self {
        let defaults = Config::default();

        Config {
            app_name: env::var("APP_NAME").unwrap_or(defaults.app_name),

            app_version: env::var("APP_VERSION").unwrap_or(defaults.app_version),

            debug: parse_bool("DEBUG", defaults.debug),

            port: match env::var("PORT") {
                Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!(env_var = "PORT", value = %raw, "Invalid port, using default");
                    defaults.port
                }),
                Err(_) => defaults.port,
            },

            elevenlabs_webhook_secret: env::var("ELEVENLABS_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    /// Builder-style override for the webhook secret.
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.elevenlabs_webhook_secret = Some(secret.into());
        self
    }
}

/// Load `.env` from the working directory. Existing variables win.
fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Parse a boolean flag such as "true", "1", "yes" or "off".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    parse_bool_value(&raw).unwrap_or_else(|| {
        warn!(env_var = name, value = %raw, "Invalid boolean, using default");
        default
    })
}

fn parse_bool_value(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
