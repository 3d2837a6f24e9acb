//! Application state.

use std::sync::Arc;

use ovl_queue::{JobQueue, JobStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub queue: JobQueue,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig, store: Arc<dyn JobStore>, queue: JobQueue) -> Self {
        Self {
            config,
            store,
            queue,
        }
    }
}
