//! Application state for the monitor service.

use std::sync::Arc;

use common::config::AppConfig;
use tokio_util::sync::CancellationToken;

use crate::manager::ConnectionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub manager: Arc<ConnectionManager>,
}

impl AppState {
    /// Creates a new application state. Background tasks stop with `shutdown`.
    pub fn new(config: AppConfig, shutdown: CancellationToken) -> Self {
        Self {
            manager: Arc::new(ConnectionManager::new(&config, shutdown)),
            config,
        }
    }
}
