//! Application state for the HTTP server.

use std::sync::Arc;

use crate::services::Orchestrator;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Owns the history store and every scheduling service
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}
