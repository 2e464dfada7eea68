//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use aussie_joke_core::AppController;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// There is exactly one session per process, so every request goes through
/// the same controller.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AppController>,
}
