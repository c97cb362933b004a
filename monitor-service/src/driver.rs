//! Driver resolution and live connection handles.
//!
//! A connection URL's scheme prefix selects the driver. SQLite, MySQL and
//! PostgreSQL are backed by sqlx; Oracle URLs are recognised but no driver is
//! compiled in.

use std::fmt;
use std::str::FromStr;

use common::errors::{AppError, AppResult};
use common::models::connection::ConnectionConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

/// Database family selected from a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Embedded SQLite (file or in-memory).
    Sqlite,
    /// Oracle Database.
    Oracle,
    /// MySQL and MariaDB.
    MySql,
    /// PostgreSQL.
    Postgres,
}

/// Scheme prefixes in match order. The first prefix that matches wins.
const SCHEMES: &[(&str, DriverKind)] = &[
    ("sqlite:", DriverKind::Sqlite),
    ("oracle:", DriverKind::Oracle),
    ("mysql:", DriverKind::MySql),
    ("mariadb:", DriverKind::MySql),
    ("postgresql:", DriverKind::Postgres),
    ("postgres:", DriverKind::Postgres),
];

/// Maps a connection URL to its driver.
///
/// # Errors
/// Returns `AppError::UnsupportedScheme` carrying the URL when no prefix matches.
pub fn resolve_driver(url: &str) -> AppResult<DriverKind> {
    SCHEMES
        .iter()
        .find(|(prefix, _)| url.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .ok_or_else(|| AppError::UnsupportedScheme(url.to_string()))
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Sqlite => write!(f, "sqlite"),
            DriverKind::Oracle => write!(f, "oracle"),
            DriverKind::MySql => write!(f, "mysql"),
            DriverKind::Postgres => write!(f, "postgres"),
        }
    }
}

impl DriverKind {
    /// Opens a single connection for `config`.
    ///
    /// Non-empty credentials from the config override any in the URL. SQLite
    /// ignores them.
    pub async fn open(&self, config: &ConnectionConfig) -> AppResult<LiveConnection> {
        let url = config.url.as_str();
        match self {
            DriverKind::Sqlite => {
                let conn = SqliteConnectOptions::from_str(url)
                    .map_err(connection_failure)?
                    .connect()
                    .await
                    .map_err(connection_failure)?;
                Ok(LiveConnection::Sqlite(conn))
            }
            DriverKind::MySql => {
                let mut options = MySqlConnectOptions::from_str(url).map_err(connection_failure)?;
                if let Some(username) = non_empty(&config.username) {
                    options = options.username(username);
                }
                if let Some(password) = non_empty(&config.password) {
                    options = options.password(password);
                }
                let conn = options.connect().await.map_err(connection_failure)?;
                Ok(LiveConnection::MySql(conn))
            }
            DriverKind::Postgres => {
                let mut options = PgConnectOptions::from_str(url).map_err(connection_failure)?;
                if let Some(username) = non_empty(&config.username) {
                    options = options.username(username);
                }
                if let Some(password) = non_empty(&config.password) {
                    options = options.password(password);
                }
                let conn = options.connect().await.map_err(connection_failure)?;
                Ok(LiveConnection::Postgres(conn))
            }
            DriverKind::Oracle => Err(AppError::DriverUnavailable(format!(
                "no {} driver is compiled into this build",
                self
            ))),
        }
    }
}

/// An open connection to an external database.
pub enum LiveConnection {
    /// SQLite connection.
    Sqlite(SqliteConnection),
    /// MySQL connection.
    MySql(MySqlConnection),
    /// PostgreSQL connection.
    Postgres(PgConnection),
}

impl fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LiveConnection").field(&self.kind()).finish()
    }
}

impl LiveConnection {
    /// Driver family of this connection.
    pub fn kind(&self) -> DriverKind {
        match self {
            LiveConnection::Sqlite(_) => DriverKind::Sqlite,
            LiveConnection::MySql(_) => DriverKind::MySql,
            LiveConnection::Postgres(_) => DriverKind::Postgres,
        }
    }

    /// Closes the connection gracefully.
    pub async fn close(self) -> AppResult<()> {
        let result = match self {
            LiveConnection::Sqlite(conn) => conn.close().await,
            LiveConnection::MySql(conn) => conn.close().await,
            LiveConnection::Postgres(conn) => conn.close().await,
        };
        result.map_err(connection_failure)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn connection_failure(err: sqlx::Error) -> AppError {
    AppError::ConnectionFailure(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_supported_prefixes() {
        let cases = [
            ("sqlite::memory:", DriverKind::Sqlite),
            ("sqlite://data/app.db", DriverKind::Sqlite),
            ("oracle://scott@db:1521/XE", DriverKind::Oracle),
            ("mysql://root@localhost:3306/app", DriverKind::MySql),
            ("mariadb://root@localhost/app", DriverKind::MySql),
            ("postgres://pg@localhost/app", DriverKind::Postgres),
            ("postgresql://pg@localhost/app", DriverKind::Postgres),
        ];
        for (url, expected) in cases {
            assert_eq!(resolve_driver(url).unwrap(), expected, "{url}");
        }
    }

    #[test]
    fn test_resolve_unsupported_carries_url() {
        for url in ["jdbc:h2:mem:test", "db2://host/x", "", "MYSQL://upper/case", "redis://cache"] {
            match resolve_driver(url) {
                Err(AppError::UnsupportedScheme(got)) => assert_eq!(got, url),
                other => panic!("expected UnsupportedScheme for {url:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_open_sqlite_memory() {
        let config = ConnectionConfig::new("mem", "sqlite::memory:");
        let conn = DriverKind::Sqlite.open(&config).await.unwrap();
        assert_eq!(conn.kind(), DriverKind::Sqlite);
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_oracle_is_unavailable() {
        let config = ConnectionConfig::new("ora", "oracle://scott@db:1521/XE");
        let err = DriverKind::Oracle.open(&config).await.unwrap_err();
        assert_eq!(err.code(), "DRIVER_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_open_missing_sqlite_file_fails() {
        let config = ConnectionConfig::new("gone", "sqlite:/nonexistent-dir/definitely/missing.db");
        let err = DriverKind::Sqlite.open(&config).await.unwrap_err();
        assert!(matches!(err, AppError::ConnectionFailure(_)), "{err:?}");
    }
}
