//! crates/farm_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the assistant's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like speech devices or APIs.

use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error taxonomy shared by all port operations.
///
/// Callers branch on the variant to decide what the user sees: permission
/// problems get actionable text, rate limiting is presented as retryable,
/// quota exhaustion as temporarily unavailable, and everything else as a
/// generic failure.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The user denied access to a required device (e.g. the microphone).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The capability is absent in the running environment. This is a
    /// supported runtime condition, not a fault.
    #[error("Unsupported in this environment: {0}")]
    Unsupported(String),
    /// The upstream service is rate limiting; the caller may retry shortly.
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// The upstream service's quota or billing is exhausted.
    #[error("Service exhausted: {0}")]
    Exhausted(String),
    /// The input was rejected locally, before any external call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Anything else: network failure, malformed response, missing credential.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A synthesis voice advertised by a [`SynthesisService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthVoice {
    pub name: String,
    /// Locale code such as `hi-IN`; matched by language tag prefix.
    pub locale: String,
}

/// Playback tuning applied to every utterance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeakOptions {
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
        }
    }
}

/// Single-shot speech capture (speech-to-text).
#[async_trait]
pub trait CaptureService: Send + Sync {
    /// Resolves once the user has granted microphone access.
    ///
    /// Must complete with `Ok` before any capture pass starts; a denial
    /// surfaces as [`PortError::PermissionDenied`].
    async fn request_permission(&self) -> PortResult<()>;

    /// Runs one non-continuous recognition pass in the given locale and
    /// resolves with the transcript.
    async fn capture(&self, locale: &str) -> PortResult<String>;
}

/// Speech playback (text-to-speech).
#[async_trait]
pub trait SynthesisService: Send + Sync {
    /// The voices available in this environment, possibly empty.
    fn voices(&self) -> Vec<SynthVoice>;

    /// Synthesizes `text` in the given locale and resolves on natural
    /// completion. Passing `None` for `voice` selects the adapter default.
    async fn speak(
        &self,
        text: &str,
        locale: &str,
        voice: Option<&SynthVoice>,
        options: &SpeakOptions,
    ) -> PortResult<()>;
}

/// One question in, one reply out.
///
/// Implemented both by the upstream gateway adapter (server side) and by the
/// relay HTTP client (client side), so the session controller and the web
/// handler consume the same contract.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Produces a reply to `message`, mirroring the message's language.
    /// The optional hint is a locale code used only to break detection ties.
    async fn reply(&self, message: &str, language_hint: Option<&str>) -> PortResult<String>;
}
