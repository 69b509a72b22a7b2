//! services/api/src/session/controller.rs
//!
//! The conversational session controller: orchestrates the turn-taking loop
//! between the user and the assistant across three concurrent channels
//! (speech capture, the relay request, speech playback) while keeping the
//! visible transcript consistent.

use crate::session::state::SessionState;
use farm_assistant_core::{
    domain::{Language, Message, MessageRole, Notice},
    ports::{AssistantService, CaptureService, PortError, SpeakOptions, SynthesisService},
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Drives one chat session. Cheap to clone; all clones share the same state.
///
/// Capture and synthesis are optional capabilities: a runtime without them
/// degrades gracefully to text-only interaction instead of failing.
#[derive(Clone)]
pub struct SessionController {
    assistant: Arc<dyn AssistantService>,
    capture: Option<Arc<dyn CaptureService>>,
    synthesis: Option<Arc<dyn SynthesisService>>,
    state: Arc<Mutex<SessionState>>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl SessionController {
    /// Creates a controller and the receiving end of its notice channel.
    pub fn new(
        assistant: Arc<dyn AssistantService>,
        capture: Option<Arc<dyn CaptureService>>,
        synthesis: Option<Arc<dyn SynthesisService>>,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let controller = Self {
            assistant,
            capture,
            synthesis,
            state: Arc::new(Mutex::new(SessionState::new())),
            notices,
        };
        (controller, notice_rx)
    }

    fn notify(&self, notice: Notice) {
        // A dropped receiver just means nobody is showing notices anymore.
        let _ = self.notices.send(notice);
    }

    //=====================================================================================
    // Capture (speech-to-text)
    //=====================================================================================

    /// Begins a single-shot recognition pass in the selected locale.
    ///
    /// No-op while a capture or a relay request is already in progress.
    /// Microphone permission must resolve before any state changes.
    pub async fn start_capture(&self) {
        let Some(capture) = self.capture.clone() else {
            self.notify(Notice::error(
                "Voice input is not supported in this environment.",
            ));
            return;
        };

        {
            let state = self.state.lock().await;
            if state.is_listening || state.is_loading {
                return;
            }
        }

        if let Err(reason) = capture.request_permission().await {
            warn!("Microphone permission not granted: {}", reason);
            self.notify(Notice::error(
                "Could not access microphone. Please check permissions.",
            ));
            return;
        }

        let (token, locale) = {
            let mut state = self.state.lock().await;
            // Re-check: permission resolution is a suspension point.
            if state.is_listening || state.is_loading {
                return;
            }
            state.is_listening = true;
            state.capture_token = CancellationToken::new();
            (state.capture_token.clone(), state.selected_language.locale())
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    // stop_capture already reset the state.
                }
                result = capture.capture(locale) => {
                    if token.is_cancelled() {
                        return;
                    }
                    match result {
                        Ok(transcript) => this.on_capture_result(transcript).await,
                        Err(reason) => this.on_capture_error(reason).await,
                    }
                }
            }
        });
    }

    /// Terminates capture and auto-submits the transcript as typed input.
    /// Whitespace-only transcripts are dropped without a submit.
    pub async fn on_capture_result(&self, transcript: String) {
        {
            let mut state = self.state.lock().await;
            state.is_listening = false;
            state.input_text = transcript.clone();
        }
        if !transcript.trim().is_empty() {
            self.submit(&transcript).await;
        }
    }

    /// Terminates capture on error. Permission denial gets a distinct notice;
    /// every other reason fails silently to the transcript.
    pub async fn on_capture_error(&self, reason: PortError) {
        {
            let mut state = self.state.lock().await;
            state.is_listening = false;
        }
        match reason {
            PortError::PermissionDenied(_) => {
                self.notify(Notice::error(
                    "Microphone access denied. Please enable it in your settings.",
                ));
            }
            other => {
                warn!("Speech recognition error: {}", other);
            }
        }
    }

    /// User-initiated cancellation of the in-flight recognition pass.
    /// Produces no message.
    pub async fn stop_capture(&self) {
        let mut state = self.state.lock().await;
        state.capture_token.cancel();
        state.is_listening = false;
    }

    //=====================================================================================
    // Submit (relay round trip)
    //=====================================================================================

    /// Sends one user message to the assistant and appends the reply.
    ///
    /// Guarded: empty or whitespace-only text is a no-op, and a second call
    /// while a request is in flight is rejected rather than queued. The user
    /// message is appended before dispatch, so it always precedes the reply
    /// it elicits.
    pub async fn submit(&self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        let locale = {
            let mut state = self.state.lock().await;
            if state.is_loading {
                return;
            }
            state.push_message(MessageRole::User, trimmed);
            state.input_text.clear();
            state.is_loading = true;
            state.selected_language.locale()
        };

        // The state lock is not held across the relay round trip.
        let result = self.assistant.reply(trimmed, Some(locale)).await;

        match result {
            Ok(reply) => {
                let voice_enabled = {
                    let mut state = self.state.lock().await;
                    state.push_message(MessageRole::Assistant, reply.clone());
                    state.is_loading = false;
                    state.voice_enabled
                };
                if voice_enabled {
                    self.speak(reply).await;
                }
            }
            Err(reason) => {
                {
                    let mut state = self.state.lock().await;
                    state.is_loading = false;
                }
                error!("Assistant request failed: {}", reason);
                let text = match reason {
                    PortError::RateLimited(msg) | PortError::Exhausted(msg) => msg,
                    _ => "Could not get a response. Please try again.".to_string(),
                };
                self.notify(Notice::error(text));
            }
        }
    }

    /// Submits the staged input text (the send-button path).
    pub async fn submit_input(&self) {
        let text = {
            let state = self.state.lock().await;
            state.input_text.clone()
        };
        self.submit(&text).await;
    }

    //=====================================================================================
    // Playback (text-to-speech)
    //=====================================================================================

    /// Speaks `text` in the selected locale, cancelling any active playback
    /// first. Fire-and-forget: completion is observed through `is_speaking`,
    /// never awaited by the caller.
    pub async fn speak(&self, text: impl Into<String>) {
        let text = text.into();
        let Some(synthesis) = self.synthesis.clone() else {
            return;
        };

        let previous = {
            let mut state = self.state.lock().await;
            if !state.voice_enabled {
                return;
            }
            state.playback_token.cancel();
            state.playback_handle.take()
        };
        // Wait for the previous playback to wind down fully so two playbacks
        // are never active at once.
        if let Some(handle) = previous {
            let _ = handle.await;
        }

        let (token, language) = {
            let mut state = self.state.lock().await;
            state.playback_token = CancellationToken::new();
            state.is_speaking = true;
            (state.playback_token.clone(), state.selected_language)
        };

        let this = self.clone();
        let handle = tokio::spawn(async move {
            let voice = synthesis
                .voices()
                .into_iter()
                .find(|v| v.locale.starts_with(language.primary_tag()));
            let options = SpeakOptions::default();

            tokio::select! {
                _ = token.cancelled() => {}
                result = synthesis.speak(&text, language.locale(), voice.as_ref(), &options) => {
                    if let Err(reason) = result {
                        warn!("Speech synthesis failed: {}", reason);
                    }
                }
            }

            // Whoever cancelled the token owns the flag now.
            if !token.is_cancelled() {
                let mut state = this.state.lock().await;
                state.is_speaking = false;
            }
        });

        let mut state = self.state.lock().await;
        state.playback_handle = Some(handle);
    }

    /// Cancels active playback immediately.
    pub async fn stop_speaking(&self) {
        let mut state = self.state.lock().await;
        state.playback_token.cancel();
        state.is_speaking = false;
    }

    //=====================================================================================
    // Preferences and transcript access
    //=====================================================================================

    /// Advances the language through the fixed three-element cycle and
    /// confirms the change with a notice naming the new language.
    pub async fn cycle_language(&self) {
        let label = {
            let mut state = self.state.lock().await;
            state.selected_language = state.selected_language.next();
            state.selected_language.label()
        };
        self.notify(Notice::info(format!("Language: {}", label)));
    }

    /// Flips whether replies are spoken. In-flight playback is unaffected.
    pub async fn toggle_voice(&self) {
        let mut state = self.state.lock().await;
        state.voice_enabled = !state.voice_enabled;
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.input_text = text.into();
    }

    pub async fn input_text(&self) -> String {
        self.state.lock().await.input_text.clone()
    }

    /// An ordered snapshot of the transcript.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn selected_language(&self) -> Language {
        self.state.lock().await.selected_language
    }

    pub async fn is_listening(&self) -> bool {
        self.state.lock().await.is_listening
    }

    pub async fn is_speaking(&self) -> bool {
        self.state.lock().await.is_speaking
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.is_loading
    }

    pub async fn voice_enabled(&self) -> bool {
        self.state.lock().await.voice_enabled
    }

    /// Clears the transcript, ending the conversation.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.messages.clear();
        state.input_text.clear();
        info!("Session transcript cleared.");
    }
}
