//! Connection lifecycle orchestration.
//!
//! Composes driver resolution, the registry, health checks and the scheduler
//! into the operations exposed to callers. Results are typed here; turning
//! them into status text is the service layer's job.

use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::check::{CheckOutcome, TestResult};
use common::models::connection::ConnectionConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::checker::HealthChecker;
use crate::driver::resolve_driver;
use crate::registry::ConnectionRegistry;
use crate::scheduler::Scheduler;

/// Entry point for connection lifecycle operations.
pub struct ConnectionManager {
    registry: Arc<ConnectionRegistry>,
    checker: Arc<HealthChecker>,
    scheduler: Arc<Scheduler>,
    reconcile_interval: Duration,
    shutdown: CancellationToken,
}

impl ConnectionManager {
    /// Creates a manager. Background tasks stop when `shutdown` is cancelled.
    pub fn new(config: &AppConfig, shutdown: CancellationToken) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let checker = Arc::new(HealthChecker::new(registry.clone(), config.column_width));
        let scheduler = Arc::new(Scheduler::new(
            checker.clone(),
            config.auto_test_unit,
            shutdown.clone(),
        ));
        Self {
            registry,
            checker,
            scheduler,
            reconcile_interval: config.reconcile_interval,
            shutdown,
        }
    }

    /// Starts the periodic schedule reconciliation sweep.
    pub fn spawn_reconciler(&self) -> JoinHandle<()> {
        self.scheduler.spawn_reconciler(self.reconcile_interval)
    }

    /// Opens and registers a connection, checks it once, and schedules
    /// recurring checks when its interval is positive.
    ///
    /// Returns the initial check outcome. Nothing is registered when the
    /// scheme is unsupported or the connection cannot be opened. A handle
    /// already registered under the same name is closed once replaced.
    pub async fn start(&self, config: ConnectionConfig) -> AppResult<CheckOutcome> {
        let driver = resolve_driver(&config.url)?;
        let conn = driver.open(&config).await?;

        self.scheduler.cancel(&config.name).await;
        if let Some(previous) = self.registry.register(config.clone(), conn).await {
            info!(name = %config.name, "Closing replaced connection");
            if let Err(err) = previous.close().await {
                warn!(name = %config.name, error = %err, "Failed to close replaced connection");
            }
        }

        let initial = self.checker.test_and_record(&config).await;
        if config.auto_test_enabled() {
            self.scheduler.schedule_auto_test(&config).await;
        }

        info!(name = %config.name, driver = %driver, passed = initial.is_passed(), "Connection started");
        Ok(initial)
    }

    /// Closes a live connection, forgets its config and cancels its schedule.
    ///
    /// # Errors
    /// `AppError::NotFound` when no live connection exists under `name`; the
    /// registry is left untouched. `AppError::ConnectionFailure` when closing
    /// fails, after the entry has been removed.
    pub async fn stop(&self, name: &str) -> AppResult<()> {
        let (conn, _config) = self
            .registry
            .unregister(name)
            .await
            .ok_or_else(|| AppError::NotFound(name.to_string()))?;
        self.scheduler.cancel(name).await;
        conn.close().await?;
        info!(name, "Connection stopped");
        Ok(())
    }

    /// Replaces the stored config for its name. Does not reopen or reschedule.
    pub async fn update(&self, config: ConnectionConfig) -> ConnectionConfig {
        self.registry.put_config(config.clone()).await;
        info!(name = %config.name, "Connection config updated");
        config
    }

    /// Ad-hoc check over a fresh connection. Leaves the registry untouched.
    pub async fn test(&self, config: &ConnectionConfig) -> CheckOutcome {
        self.checker.test(config).await
    }

    /// Snapshot of all stored configs.
    pub async fn list(&self) -> Vec<ConnectionConfig> {
        self.registry.configs().await
    }

    /// Last check result for `name`.
    pub async fn last_result(&self, name: &str) -> Option<TestResult> {
        self.registry.last_result(name).await
    }

    /// Number of live connections.
    pub async fn live_count(&self) -> usize {
        self.registry.live_count().await
    }

    /// Number of active auto-test schedules.
    pub async fn scheduled_count(&self) -> usize {
        self.scheduler.scheduled_count().await
    }

    /// Whether `name` has an active auto-test schedule.
    pub async fn is_scheduled(&self, name: &str) -> bool {
        self.scheduler.is_scheduled(name).await
    }

    /// Cancels background tasks and closes every live connection.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        for (name, conn) in self.registry.drain_live().await {
            if let Err(err) = conn.close().await {
                warn!(name = %name, error = %err, "Failed to close connection on shutdown");
            }
        }
        info!("Connection manager shut down");
    }
}
