//! Service configuration.
//!
//! Values come from environment variables. An optional `.env` file in the
//! working directory is read first; variables already set in the process
//! environment take precedence over it.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 8081;
/// Length of one auto-test interval unit. Intervals are configured in minutes.
pub const DEFAULT_AUTO_TEST_UNIT_SECS: u64 = 60;
/// Period of the schedule reconciliation sweep.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60;
/// Width of one column in formatted query results.
pub const DEFAULT_COLUMN_WIDTH: usize = 20;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and response metadata.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Wall-clock length of one auto-test interval unit.
    pub auto_test_unit: Duration,
    /// How often missing schedules are restored.
    pub reconcile_interval: Duration,
    /// Column width used when rendering query results.
    pub column_width: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "monitor-service".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            auto_test_unit: Duration::from_secs(DEFAULT_AUTO_TEST_UNIT_SECS),
            reconcile_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
            column_width: DEFAULT_COLUMN_WIDTH,
        }
    }
}

impl AppConfig {
    /// Loads configuration for the named service from `.env` and the environment.
    pub fn load_with_service(service_name: &str) -> Self {
        load_dotenv(Path::new(".env"));

        let defaults = Self::default();
        Self {
            service_name: service_name.to_string(),
            host: std::env::var("SERVER_HOST").unwrap_or(defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            auto_test_unit: Duration::from_secs(env_or(
                "AUTO_TEST_UNIT_SECS",
                DEFAULT_AUTO_TEST_UNIT_SECS,
            )),
            reconcile_interval: Duration::from_secs(env_or(
                "RECONCILE_INTERVAL_SECS",
                DEFAULT_RECONCILE_INTERVAL_SECS,
            )),
            column_width: env_or("RESULT_COLUMN_WIDTH", DEFAULT_COLUMN_WIDTH),
        }
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reads `key` and parses it, falling back to `default` when unset, invalid or zero.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + PartialEq + Default + Copy + std::fmt::Display,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => value,
        _ => {
            tracing::warn!(key, value = %raw, fallback = %default, "Invalid config value, using default");
            default
        }
    }
}

/// Best-effort `.env` loader; a missing or unreadable file is ignored.
fn load_dotenv(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            std::env::set_var(key, value);
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
