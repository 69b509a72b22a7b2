//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use farm_assistant_core::ports::AssistantService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. The relay itself is stateless: nothing here is mutated between
/// requests, so the service scales horizontally one request per invocation.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub assistant: Arc<dyn AssistantService>,
}
