//! crates/farm_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the assistant.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};

/// The author of a message in the conversation transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// Represents a single exchange turn in a session's transcript.
///
/// Messages are append-only: once created they are never mutated or
/// reordered, and they are cleared only when the session itself is reset.
#[derive(Debug, Clone)]
pub struct Message {
    /// Unique within a session and strictly monotonic, so insertion order
    /// is recoverable from ids alone.
    pub id: i64,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: i64, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The languages the assistant converses in, each paired with the locale
/// code used by both speech capture and speech playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Kannada,
}

impl Language {
    /// The BCP 47 locale code for recognition and synthesis.
    pub fn locale(&self) -> &'static str {
        match self {
            Language::English => "en-IN",
            Language::Hindi => "hi-IN",
            Language::Kannada => "kn-IN",
        }
    }

    /// Display label, in native script for Hindi and Kannada.
    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "हिंदी",
            Language::Kannada => "ಕನ್ನಡ",
        }
    }

    /// The bare language tag, used to match synthesis voices against a locale.
    pub fn primary_tag(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Kannada => "kn",
        }
    }

    /// Advances through the fixed cycle English -> Hindi -> Kannada -> English.
    pub fn next(&self) -> Language {
        match self {
            Language::English => Language::Hindi,
            Language::Hindi => Language::Kannada,
            Language::Kannada => Language::English,
        }
    }

    /// Parses a locale code back into a language, tolerating a bare tag.
    pub fn from_locale(code: &str) -> Option<Language> {
        match code {
            "en-IN" | "en" => Some(Language::English),
            "hi-IN" | "hi" => Some(Language::Hindi),
            "kn-IN" | "kn" => Some(Language::Kannada),
            _ => None,
        }
    }
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short, dismissable, user-facing notification emitted by the session
/// controller. Notices never block the ability to keep typing or retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}
