//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, along with the
//! mapping from error classes to HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use farm_assistant_core::ports::PortError;
use serde::Serialize;

/// The JSON body carried by every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    /// Maps the error taxonomy onto the relay's HTTP contract: 429 for rate
    /// limiting, 402 for quota exhaustion, 400 for locally rejected input,
    /// and 500 for everything else. The body never carries internal detail
    /// beyond the user-facing message.
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Port(PortError::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Port(PortError::RateLimited(msg)) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::Port(PortError::Exhausted(msg)) => (StatusCode::PAYMENT_REQUIRED, msg),
            ApiError::Port(other) => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            ApiError::Config(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody { error: message };
        (status, Json(body)).into_response()
    }
}
