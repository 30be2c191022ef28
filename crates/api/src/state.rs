//! Application state shared across handlers.

use std::sync::Arc;

use kv_store::KvStore;
use session_engine::SessionEngine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session engine over the configured store
    pub engine: SessionEngine,
}

impl AppState {
    pub fn new(engine: SessionEngine) -> Self {
        Self { engine }
    }

    /// State with a system-clock engine over `store`.
    pub fn from_store(store: Arc<dyn KvStore>) -> Self {
        Self::new(SessionEngine::new(store))
    }
}
