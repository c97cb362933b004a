//! Connection configuration models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Configuration of one monitored database connection.
///
/// The connection name is the unique key. The record is replaced wholesale on
/// update; nothing in the monitor mutates it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Unique connection name.
    #[serde(rename = "connectionName", alias = "name")]
    #[validate(length(min = 1, max = 100, message = "Connection name must be 1-100 characters"))]
    pub name: String,
    /// Connection URL; its scheme prefix selects the driver.
    #[validate(length(min = 1, message = "URL is required"))]
    pub url: String,
    /// Database username (network drivers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Database password (never serialized in responses).
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    /// Diagnostic query; the default probe runs when absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_query: Option<String>,
    /// Stored and returned, not interpreted.
    #[serde(default)]
    pub active: bool,
    /// Minutes between automatic checks. Zero or negative disables them.
    #[serde(default)]
    pub auto_test_interval: i32,
    /// Notification address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Business process tag for incoming traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_incoming: Option<String>,
    /// Business process tag for outgoing traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_outgoing: Option<String>,
    /// Business process tag for acknowledgements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_acknowledgement: Option<String>,
    /// Business process tag for synchronous responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_sync_response: Option<String>,
}

impl ConnectionConfig {
    /// Creates a config with only the fields the monitor itself reads.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the diagnostic query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.custom_query = Some(query.into());
        self
    }

    /// Sets the auto-test interval in minutes.
    pub fn with_interval(mut self, minutes: i32) -> Self {
        self.auto_test_interval = minutes;
        self
    }

    /// Whether recurring checks are requested.
    pub fn auto_test_enabled(&self) -> bool {
        self.auto_test_interval > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "connectionName": "orders",
            "email": "ops@example.com",
            "bpIncoming": "IN",
            "url": "postgres://db/orders",
            "username": "app",
            "password": "secret",
            "customQuery": "SELECT 1",
            "active": true,
            "autoTestInterval": 5
        }"#;
        let config: ConnectionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.name, "orders");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.custom_query.as_deref(), Some("SELECT 1"));
        assert_eq!(config.bp_incoming.as_deref(), Some("IN"));
        assert!(config.active);
        assert_eq!(config.auto_test_interval, 5);
    }

    #[test]
    fn test_password_not_serialized() {
        let config = ConnectionConfig {
            username: Some("u".into()),
            password: Some("p".into()),
            ..ConnectionConfig::new("db1", "sqlite::memory:")
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["connectionName"], "db1");
        assert_eq!(json["username"], "u");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_validation() {
        assert!(ConnectionConfig::new("db1", "sqlite::memory:").validate().is_ok());
        assert!(ConnectionConfig::new("", "sqlite::memory:").validate().is_err());
        assert!(ConnectionConfig::new("db1", "").validate().is_err());
    }

    #[test]
    fn test_auto_test_enabled() {
        let config = ConnectionConfig::new("db1", "sqlite::memory:");
        assert!(!config.auto_test_enabled());
        assert!(!config.clone().with_interval(-3).auto_test_enabled());
        assert!(config.with_interval(1).auto_test_enabled());
    }
}
