//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// The default OpenAI-compatible chat-completions endpoint of the AI gateway.
const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.example.dev/v1/chat/completions";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Chat-completions URL of the upstream AI gateway.
    pub gateway_url: String,
    /// The server-owned upstream credential. Optional at load time: a missing
    /// key is reported per-request as a service error, never as a crash.
    pub gateway_api_key: Option<String>,
    pub chat_model: String,
    pub upstream_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upstream Gateway Settings ---
        let gateway_url =
            std::env::var("AI_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());

        // The API key is optional here; the assistant adapter fails fast when
        // asked to make a call without it.
        let gateway_api_key = std::env::var("AI_GATEWAY_API_KEY").ok();

        let chat_model = std::env::var("CHAT_MODEL")
            .unwrap_or_else(|_| "google/gemini-2.5-flash".to_string());

        let timeout_secs_str =
            std::env::var("UPSTREAM_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let timeout_secs = timeout_secs_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "UPSTREAM_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a valid number of seconds", timeout_secs_str),
            )
        })?;

        Ok(Self {
            bind_address,
            log_level,
            gateway_url,
            gateway_api_key,
            chat_model,
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
