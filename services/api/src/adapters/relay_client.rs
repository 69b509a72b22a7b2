//! services/api/src/adapters/relay_client.rs
//!
//! This module contains the HTTP client adapter the session controller uses
//! to reach the assistant relay. It implements the same `AssistantService`
//! port as the upstream gateway adapter, so the controller never knows which
//! side of the wire it is on.

use async_trait::async_trait;
use farm_assistant_core::ports::{AssistantService, PortError, PortResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

#[derive(Serialize)]
struct RelayRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Deserialize)]
struct RelayReply {
    reply: String,
}

#[derive(Deserialize)]
struct RelayFailure {
    error: String,
}

/// An adapter that implements `AssistantService` by calling the relay's
/// `POST /assistant` endpoint.
#[derive(Clone)]
pub struct RelayClientAdapter {
    client: Client,
    endpoint: String,
}

impl RelayClientAdapter {
    /// Creates a new `RelayClientAdapter` pointed at the relay endpoint.
    pub fn new(endpoint: String, timeout: Duration) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl AssistantService for RelayClientAdapter {
    /// Posts the message and language hint, mapping the relay's status codes
    /// back into the port error taxonomy.
    async fn reply(&self, message: &str, language_hint: Option<&str>) -> PortResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RelayRequest {
                message,
                language: language_hint,
            })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Relay request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<RelayFailure>()
                .await
                .map(|failure| failure.error)
                .unwrap_or_else(|_| "Relay returned an unreadable error".to_string());
            error!("Relay error: {} - {}", status, detail);

            return Err(match status.as_u16() {
                429 => PortError::RateLimited(detail),
                402 => PortError::Exhausted(detail),
                400 => PortError::InvalidInput(detail),
                _ => PortError::Unexpected(detail),
            });
        }

        let body: RelayReply = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed relay response: {}", e)))?;

        Ok(body.reply)
    }
}
