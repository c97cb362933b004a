//! Recurring auto-tests and the reconciliation sweep.
//!
//! Every connection with a positive auto-test interval gets one task that
//! re-checks it every `interval` units. A separate sweep restores schedules
//! for configs that should have one but don't.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::models::connection::ConnectionConfig;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::checker::HealthChecker;

/// Token for one running schedule.
struct ScheduleHandle {
    /// Distinguishes a schedule from a later one under the same name.
    id: u64,
    token: CancellationToken,
}

/// Owner of all auto-test schedules. At most one schedule exists per name.
pub struct Scheduler {
    checker: Arc<HealthChecker>,
    schedules: RwLock<HashMap<String, ScheduleHandle>>,
    next_id: AtomicU64,
    /// Wall-clock length of one interval unit (a minute in production).
    unit: Duration,
    /// Parent of every schedule token.
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler whose tasks stop when `shutdown` is cancelled.
    pub fn new(checker: Arc<HealthChecker>, unit: Duration, shutdown: CancellationToken) -> Self {
        Self {
            checker,
            schedules: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            unit,
            shutdown,
        }
    }

    /// Period between checks for an interval, `None` when auto-testing is off.
    pub fn period(&self, interval: i32) -> Option<Duration> {
        u32::try_from(interval)
            .ok()
            .filter(|minutes| *minutes > 0)
            .map(|minutes| self.unit * minutes)
    }

    /// Starts recurring checks for `config`, replacing any existing schedule.
    ///
    /// No-op returning `false` when the interval is zero or negative, or when
    /// the registry holds no config under the name. The first check fires one
    /// period from now. Each firing awaits its check before waiting for the
    /// next tick, so checks for one name never overlap.
    pub async fn schedule_auto_test(self: &Arc<Self>, config: &ConnectionConfig) -> bool {
        let Some(period) = self.period(config.auto_test_interval) else {
            return false;
        };

        let name = config.name.clone();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        {
            // Config removal always precedes `cancel`, which waits for this lock,
            // so a handle inserted here is either seen by that cancel or never inserted.
            let mut schedules = self.schedules.write().await;
            if self.checker.registry().config(&name).await.is_none() {
                debug!(name = %name, "No config registered, auto-test not scheduled");
                return false;
            }
            let replaced = schedules.insert(
                name.clone(),
                ScheduleHandle {
                    id,
                    token: token.clone(),
                },
            );
            if let Some(previous) = replaced {
                previous.token.cancel();
            }
        }

        info!(name = %name, interval_minutes = config.auto_test_interval, "Auto-test scheduled");

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(name = %name, "Auto-test cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if scheduler.checker.check_registered(&name).await.is_none() {
                            debug!(name = %name, "Config gone or auto-test disabled, ending schedule");
                            break;
                        }
                    }
                }
            }

            scheduler.release(&name, id).await;
        });
        true
    }

    /// Cancels the schedule for `name`. Returns whether one existed.
    pub async fn cancel(&self, name: &str) -> bool {
        match self.schedules.write().await.remove(name) {
            Some(handle) => {
                handle.token.cancel();
                info!(name, "Auto-test cancelled");
                true
            }
            None => false,
        }
    }

    /// Drops the handle for `name` if it still belongs to schedule `id`.
    async fn release(&self, name: &str, id: u64) {
        let mut schedules = self.schedules.write().await;
        if schedules.get(name).is_some_and(|handle| handle.id == id) {
            schedules.remove(name);
        }
    }

    /// Whether `name` currently has a schedule.
    pub async fn is_scheduled(&self, name: &str) -> bool {
        self.schedules.read().await.contains_key(name)
    }

    /// Number of active schedules.
    pub async fn scheduled_count(&self) -> usize {
        self.schedules.read().await.len()
    }

    /// Schedules every config with a positive interval that has no schedule.
    ///
    /// Returns how many schedules were restored. Existing schedules are left
    /// alone.
    pub async fn reconcile(self: &Arc<Self>) -> usize {
        let mut restored = 0;
        for config in self.checker.registry().configs().await {
            if config.auto_test_enabled()
                && !self.is_scheduled(&config.name).await
                && self.schedule_auto_test(&config).await
            {
                info!(name = %config.name, "Restored missing auto-test schedule");
                restored += 1;
            }
        }
        restored
    }

    /// Spawns the sweep that runs [`Scheduler::reconcile`] every `every`.
    pub fn spawn_reconciler(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = every.as_secs_f64(), "Schedule reconciliation started");

            loop {
                tokio::select! {
                    _ = scheduler.shutdown.cancelled() => {
                        info!("Schedule reconciliation shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let restored = scheduler.reconcile().await;
                        debug!(restored, "Reconciliation sweep finished");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverKind;
    use crate::registry::ConnectionRegistry;
    use common::models::check::TestResult;
    use std::collections::HashSet;

    const UNIT: Duration = Duration::from_millis(40);
    const SLOW_QUERY: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 2000000) \
                              SELECT COUNT(*) AS n FROM c";

    fn scheduler() -> Arc<Scheduler> {
        let checker = Arc::new(HealthChecker::new(Arc::new(ConnectionRegistry::new()), 20));
        Arc::new(Scheduler::new(checker, UNIT, CancellationToken::new()))
    }

    async fn last(scheduler: &Scheduler, name: &str) -> Option<TestResult> {
        scheduler.checker.registry().last_result(name).await
    }

    #[test]
    fn test_period() {
        let scheduler = scheduler();
        assert_eq!(scheduler.period(0), None);
        assert_eq!(scheduler.period(-5), None);
        assert_eq!(scheduler.period(3), Some(UNIT * 3));
    }

    #[tokio::test]
    async fn test_non_positive_interval_is_noop() {
        let scheduler = scheduler();
        let config = ConnectionConfig::new("db", "sqlite::memory:");
        assert!(!scheduler.schedule_auto_test(&config).await);
        assert!(!scheduler.schedule_auto_test(&config.with_interval(-1)).await);
        assert_eq!(scheduler.scheduled_count().await, 0);
    }

    #[tokio::test]
    async fn test_firing_records_result() {
        let scheduler = scheduler();
        let config = ConnectionConfig::new("db", "sqlite::memory:")
            .with_query("SELECT 1 as test_value")
            .with_interval(1);
        scheduler.checker.registry().put_config(config.clone()).await;

        assert!(scheduler.schedule_auto_test(&config).await);
        assert!(scheduler.is_scheduled("db").await);
        assert!(last(&scheduler, "db").await.is_none());

        tokio::time::sleep(UNIT * 4).await;
        let result = last(&scheduler, "db").await.expect("scheduled check ran");
        assert!(result.outcome.is_passed());
        assert!(result.outcome.to_string().contains("test_value"));
    }

    #[tokio::test]
    async fn test_failures_keep_schedule_alive() {
        let scheduler = scheduler();
        let config = ConnectionConfig::new("broken", "db2://host/x").with_interval(1);
        scheduler.checker.registry().put_config(config.clone()).await;
        scheduler.schedule_auto_test(&config).await;

        tokio::time::sleep(UNIT * 3).await;
        let first = last(&scheduler, "broken").await.expect("first failure recorded");
        assert!(!first.outcome.is_passed());

        tokio::time::sleep(UNIT * 3).await;
        let later = last(&scheduler, "broken").await.unwrap();
        assert!(later.timestamp > first.timestamp);
        assert!(scheduler.is_scheduled("broken").await);
    }

    #[tokio::test]
    async fn test_cancel_stops_firing() {
        let scheduler = scheduler();
        let config = ConnectionConfig::new("db", "sqlite::memory:").with_interval(1);
        scheduler.checker.registry().put_config(config.clone()).await;
        scheduler.schedule_auto_test(&config).await;

        assert!(scheduler.cancel("db").await);
        assert!(!scheduler.cancel("db").await);
        tokio::time::sleep(UNIT * 3).await;
        assert!(last(&scheduler, "db").await.is_none());
    }

    #[tokio::test]
    async fn test_reschedule_replaces_existing() {
        let scheduler = scheduler();
        let config = ConnectionConfig::new("db", "sqlite::memory:").with_interval(1);
        scheduler.checker.registry().put_config(config.clone()).await;
        scheduler.schedule_auto_test(&config).await;
        scheduler.schedule_auto_test(&config).await;
        assert_eq!(scheduler.scheduled_count().await, 1);

        // The replaced task must not remove the new handle when it exits.
        tokio::time::sleep(UNIT * 2).await;
        assert!(scheduler.is_scheduled("db").await);
    }

    #[tokio::test]
    async fn test_schedule_requires_registered_config() {
        let scheduler = scheduler();
        let config = ConnectionConfig::new("db", "sqlite::memory:").with_interval(1);
        assert!(!scheduler.schedule_auto_test(&config).await);
        assert!(!scheduler.is_scheduled("db").await);
    }

    #[tokio::test]
    async fn test_schedule_ends_when_config_removed() {
        let scheduler = scheduler();
        let registry = scheduler.checker.registry().clone();
        let config = ConnectionConfig::new("db", "sqlite::memory:").with_interval(1);
        let conn = DriverKind::Sqlite.open(&config).await.unwrap();
        registry.register(config.clone(), conn).await;
        assert!(scheduler.schedule_auto_test(&config).await);

        let (conn, _) = registry.unregister("db").await.unwrap();
        conn.close().await.unwrap();
        tokio::time::sleep(UNIT * 3).await;
        assert!(!scheduler.is_scheduled("db").await);
        assert!(last(&scheduler, "db").await.is_none());
    }

    #[tokio::test]
    async fn test_schedule_ends_when_auto_test_disabled() {
        let scheduler = scheduler();
        let registry = scheduler.checker.registry().clone();
        let config = ConnectionConfig::new("db", "sqlite::memory:").with_interval(1);
        registry.put_config(config.clone()).await;
        assert!(scheduler.schedule_auto_test(&config).await);

        registry.put_config(config.with_interval(0)).await;
        tokio::time::sleep(UNIT * 3).await;
        assert!(!scheduler.is_scheduled("db").await);
        assert!(last(&scheduler, "db").await.is_none());
        assert_eq!(scheduler.reconcile().await, 0);
    }

    #[tokio::test]
    async fn test_slow_checks_do_not_overlap() {
        let scheduler = scheduler();
        let config = ConnectionConfig::new("slow", "sqlite::memory:")
            .with_query(SLOW_QUERY)
            .with_interval(1);
        scheduler.checker.registry().put_config(config.clone()).await;

        let started = Instant::now();
        assert!(scheduler.checker.test(&config).await.is_passed());
        let check_time = started.elapsed().max(UNIT);

        assert!(scheduler.schedule_auto_test(&config).await);
        let window = check_time * 5;
        let deadline = Instant::now() + window;
        let mut completed = HashSet::new();
        while Instant::now() < deadline {
            if let Some(result) = last(&scheduler, "slow").await {
                completed.insert(result.timestamp);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        scheduler.cancel("slow").await;

        // Ticks arrive every UNIT; one check at a time caps completions by check time.
        let cap = (window.as_millis() / check_time.as_millis()) as usize * 2 + 2;
        assert!(
            completed.len() <= cap,
            "{} checks finished within {:?} at {:?} per check",
            completed.len(),
            window,
            check_time
        );
    }

    #[tokio::test]
    async fn test_reconcile_restores_missing_only() {
        let scheduler = scheduler();
        let registry = scheduler.checker.registry().clone();
        registry
            .put_config(ConnectionConfig::new("auto", "sqlite::memory:").with_interval(5))
            .await;
        registry.put_config(ConnectionConfig::new("manual", "sqlite::memory:")).await;

        assert_eq!(scheduler.reconcile().await, 1);
        assert!(scheduler.is_scheduled("auto").await);
        assert!(!scheduler.is_scheduled("manual").await);
        assert_eq!(scheduler.reconcile().await, 0);
        assert_eq!(scheduler.scheduled_count().await, 1);
    }

    #[tokio::test]
    async fn test_reconciler_task_and_shutdown() {
        let shutdown = CancellationToken::new();
        let checker = Arc::new(HealthChecker::new(Arc::new(ConnectionRegistry::new()), 20));
        let scheduler = Arc::new(Scheduler::new(checker, Duration::from_secs(3600), shutdown.clone()));
        scheduler
            .checker
            .registry()
            .put_config(ConnectionConfig::new("late", "sqlite::memory:").with_interval(1))
            .await;

        let sweep = scheduler.spawn_reconciler(UNIT);
        tokio::time::sleep(UNIT * 3).await;
        assert!(scheduler.is_scheduled("late").await);

        shutdown.cancel();
        sweep.await.unwrap();
        tokio::time::sleep(UNIT).await;
        assert!(!scheduler.is_scheduled("late").await);
    }
}
