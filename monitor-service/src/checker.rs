//! Single health checks.

use std::sync::Arc;

use common::errors::AppResult;
use common::models::check::{CheckOutcome, TestResult};
use common::models::connection::ConnectionConfig;
use tracing::{debug, info, warn};

use crate::driver::resolve_driver;
use crate::executor;
use crate::registry::ConnectionRegistry;

/// Runs health checks and records their outcome in the registry.
pub struct HealthChecker {
    registry: Arc<ConnectionRegistry>,
    column_width: usize,
}

impl HealthChecker {
    /// Creates a checker that records into `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>, column_width: usize) -> Self {
        Self {
            registry,
            column_width,
        }
    }

    /// Registry the checker records into.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Checks `config` over a fresh, short-lived connection.
    ///
    /// Never touches the registry and never fails; failures come back as
    /// [`CheckOutcome::Failed`].
    pub async fn test(&self, config: &ConnectionConfig) -> CheckOutcome {
        info!(name = %config.name, url = %config.url, "Testing connection");
        match self.probe(config).await {
            Ok(report) => CheckOutcome::Passed {
                url: config.url.clone(),
                report,
            },
            Err(err) => {
                warn!(name = %config.name, url = %config.url, error = %err, "Connection test failed");
                CheckOutcome::Failed(err)
            }
        }
    }

    async fn probe(&self, config: &ConnectionConfig) -> AppResult<String> {
        let driver = resolve_driver(&config.url)?;
        let mut conn = driver.open(config).await?;
        let report = executor::execute(&mut conn, config.custom_query.as_deref(), self.column_width).await;
        if let Err(err) = conn.close().await {
            debug!(name = %config.name, error = %err, "Closing test connection failed");
        }
        report
    }

    /// Tests `config` and stores the outcome as the name's last result.
    pub async fn test_and_record(&self, config: &ConnectionConfig) -> CheckOutcome {
        let outcome = self.test(config).await;
        self.registry
            .record_result(&config.name, TestResult::now(outcome.clone()))
            .await;
        outcome
    }

    /// Scheduled check for `name` against its current config.
    ///
    /// Returns `None` without checking when the name no longer has a config
    /// or its config no longer asks for auto-tests.
    pub async fn check_registered(&self, name: &str) -> Option<CheckOutcome> {
        let config = self
            .registry
            .config(name)
            .await
            .filter(ConnectionConfig::auto_test_enabled)?;
        let outcome = self.test_and_record(&config).await;
        match &outcome {
            CheckOutcome::Passed { .. } => info!(name, "Auto-test completed"),
            CheckOutcome::Failed(err) => warn!(name, error = %err, "Auto-test failed"),
        }
        Some(outcome)
    }
}
