//! Application state shared across handlers.

use std::sync::Arc;

use clickhouse_client::EventStore;
use worker::Exporter;

use crate::scroll::ScrollProgress;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Event store (degraded mode turns writes into no-ops)
    pub store: Arc<EventStore>,
    /// Export cycle runner, shared with the scheduler
    pub exporter: Arc<Exporter>,
    /// Scroll milestone trackers
    pub scroll_progress: ScrollProgress,
}

impl AppState {
    pub fn new(store: Arc<EventStore>, exporter: Arc<Exporter>) -> Self {
        Self {
            store,
            exporter,
            scroll_progress: ScrollProgress::new(),
        }
    }
}
