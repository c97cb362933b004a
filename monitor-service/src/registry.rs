//! Concurrent store of live connections, their configs and last check results.
//!
//! All three maps are keyed by connection name. A name with a live connection
//! always has a config; a config may exist on its own (after `update`).

use std::collections::HashMap;

use common::models::check::TestResult;
use common::models::connection::ConnectionConfig;
use tokio::sync::{Mutex, RwLock};

use crate::driver::LiveConnection;

/// Registry of everything the monitor knows about each connection name.
///
/// Lock order is `live` before `configs`. Paired writes (register/unregister)
/// hold both; everything else touches a single map.
#[derive(Default)]
pub struct ConnectionRegistry {
    /// Open handles. Owned here until stop or shutdown.
    live: RwLock<HashMap<String, Mutex<LiveConnection>>>,
    /// Configuration records.
    configs: RwLock<HashMap<String, ConnectionConfig>>,
    /// Last check result per name, overwritten by every check.
    results: RwLock<HashMap<String, TestResult>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a config together with its live handle.
    ///
    /// Returns the handle that was displaced, if the name was already live, so
    /// the caller can close it.
    pub async fn register(&self, config: ConnectionConfig, conn: LiveConnection) -> Option<LiveConnection> {
        let mut live = self.live.write().await;
        let mut configs = self.configs.write().await;
        let name = config.name.clone();
        configs.insert(name.clone(), config);
        live.insert(name, Mutex::new(conn)).map(Mutex::into_inner)
    }

    /// Removes a live handle and its config in one step.
    ///
    /// Returns `None` and changes nothing when the name has no live handle.
    pub async fn unregister(&self, name: &str) -> Option<(LiveConnection, Option<ConnectionConfig>)> {
        let mut live = self.live.write().await;
        let conn = live.remove(name)?;
        let config = self.configs.write().await.remove(name);
        Some((conn.into_inner(), config))
    }

    /// Replaces the config for its name, live handle or not.
    pub async fn put_config(&self, config: ConnectionConfig) -> Option<ConnectionConfig> {
        self.configs.write().await.insert(config.name.clone(), config)
    }

    /// Config for `name`.
    pub async fn config(&self, name: &str) -> Option<ConnectionConfig> {
        self.configs.read().await.get(name).cloned()
    }

    /// Snapshot of all configs, sorted by name.
    pub async fn configs(&self) -> Vec<ConnectionConfig> {
        let mut configs: Vec<ConnectionConfig> = self.configs.read().await.values().cloned().collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    /// Number of open handles.
    pub async fn live_count(&self) -> usize {
        self.live.read().await.len()
    }

    /// Removes every live handle, leaving configs and results in place.
    pub async fn drain_live(&self) -> Vec<(String, LiveConnection)> {
        self.live
            .write()
            .await
            .drain()
            .map(|(name, conn)| (name, conn.into_inner()))
            .collect()
    }

    /// Overwrites the last result for `name`.
    pub async fn record_result(&self, name: &str, result: TestResult) {
        self.results.write().await.insert(name.to_string(), result);
    }

    /// Last result for `name`.
    pub async fn last_result(&self, name: &str) -> Option<TestResult> {
        self.results.read().await.get(name).cloned()
    }
}
