//! services/api/src/session/state.rs
//!
//! Defines the state owned by one conversational session.

use chrono::Utc;
use farm_assistant_core::domain::{Language, Message, MessageRole};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The state for a single, active assistant session.
///
/// Owned exclusively by the `SessionController` behind a mutex and never
/// persisted: a reset starts the conversation over.
pub struct SessionState {
    /// Ordered transcript; insertion order is conversation order.
    pub messages: Vec<Message>,
    /// Staged typed input, cleared on submit.
    pub input_text: String,
    pub selected_language: Language,
    pub is_listening: bool,
    pub is_speaking: bool,
    pub is_loading: bool,
    pub voice_enabled: bool,
    /// A token to abort the in-flight capture pass.
    pub capture_token: CancellationToken,
    /// A token to cancel the active playback.
    pub playback_token: CancellationToken,
    /// Handle of the active playback task, awaited before a new one starts.
    pub playback_handle: Option<JoinHandle<()>>,
    last_message_id: i64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input_text: String::new(),
            selected_language: Language::default(),
            is_listening: false,
            is_speaking: false,
            is_loading: false,
            voice_enabled: true,
            capture_token: CancellationToken::new(),
            playback_token: CancellationToken::new(),
            playback_handle: None,
            last_message_id: 0,
        }
    }

    /// Produces the next message id: the creation-time millisecond timestamp,
    /// bumped past the previous id when two turns land in the same
    /// millisecond. Ids therefore stay strictly monotonic per session.
    pub fn next_message_id(&mut self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        let id = now_ms.max(self.last_message_id + 1);
        self.last_message_id = id;
        id
    }

    /// Appends a new message and returns a clone of it.
    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) -> Message {
        let id = self.next_message_id();
        let message = Message::new(id, role, content);
        self.messages.push(message.clone());
        message
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
