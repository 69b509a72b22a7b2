//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the upstream AI gateway.
//! It implements the `AssistantService` port from the `core` crate.

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a helpful agricultural assistant for Indian farmers. You help with:
- Crop management and farming techniques
- Weather and seasonal advice
- Market prices and selling tips
- Pest and disease identification
- Government schemes and subsidies
- General farming queries

CRITICAL LANGUAGE RULES:
1. Detect the language of the user's message (Hindi, Kannada, or English)
2. ALWAYS respond in the SAME language the user used
3. If the user writes in Hindi (using Devanagari script or romanized), respond in Hindi
4. If the user writes in Kannada (using Kannada script or romanized), respond in Kannada
5. If the user writes in English, respond in English
6. Keep responses concise, practical, and farmer-friendly
7. Use simple language that rural farmers can understand
8. If you're unsure about the language, respond in the language hint provided: {language_hint}

Examples:
- "मेरी फसल में कीड़े लग गए हैं" → Respond in Hindi
- "ನನ್ನ ಬೆಳೆಯಲ್ಲಿ ಕೀಟಗಳು ಬಂದಿವೆ" → Respond in Kannada
- "My crops have pests" → Respond in English
- "mere fasal mein keede lag gaye" → Respond in Hindi (romanized)
- "nanna beleyli keetalu bandive" → Respond in Kannada (romanized)"#;

/// Substituted when the upstream completion comes back empty.
const FALLBACK_REPLY: &str = "I couldn't process your request. Please try again.";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

use async_trait::async_trait;
use farm_assistant_core::ports::{AssistantService, PortError, PortResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Builds the fixed system instruction sent with every upstream request.
///
/// Pure function: the prompt contract (agricultural scope, language
/// mirroring, tone) is testable independently of the HTTP plumbing. The
/// `language_hint` is a locale code used only as a detection tie-breaker.
pub fn build_system_prompt(language_hint: Option<&str>) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{language_hint}", language_hint.unwrap_or("auto-detect"))
}

//=========================================================================================
// Upstream Wire Types
//=========================================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AssistantService` against an OpenAI-compatible
/// chat-completions gateway.
#[derive(Clone)]
pub struct GatewayChatAdapter {
    client: Client,
    gateway_url: String,
    /// Server-owned credential; never serialized into any response or log.
    api_key: Option<String>,
    model: String,
}

impl GatewayChatAdapter {
    /// Creates a new `GatewayChatAdapter` with a bounded request timeout.
    pub fn new(
        gateway_url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            gateway_url,
            api_key,
            model,
        })
    }
}

//=========================================================================================
// `AssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssistantService for GatewayChatAdapter {
    /// Forwards the user message to the upstream model and normalizes the reply.
    ///
    /// Upstream failures classify by status: 429 stays retryable, 402 means
    /// the service's quota is spent, anything else is a generic service error.
    /// No upstream call is attempted without a configured credential.
    async fn reply(&self, message: &str, language_hint: Option<&str>) -> PortResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PortError::Unexpected("AI_GATEWAY_API_KEY is not configured".to_string())
        })?;

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: build_system_prompt(language_hint),
                },
                ChatMessage {
                    role: "user",
                    content: message.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.gateway_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("AI gateway request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("AI gateway error: {} - {}", status, body);

            return Err(match status.as_u16() {
                429 => PortError::RateLimited(
                    "Too many requests. Please try again in a moment.".to_string(),
                ),
                402 => PortError::Exhausted(
                    "Service temporarily unavailable. Please try again later.".to_string(),
                ),
                _ => PortError::Unexpected("AI service error".to_string()),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed AI gateway response: {}", e)))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        info!(
            "AI response: {}...",
            reply.chars().take(100).collect::<String>()
        );

        Ok(reply)
    }
}
