//! Health check outcome models.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::AppError;

/// Result of one health check, tagged by success or failure category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The connection opened and the diagnostic query ran.
    Passed {
        /// URL that was checked.
        url: String,
        /// Formatted query result.
        report: String,
    },
    /// The check failed; the error carries the category and driver message.
    Failed(AppError),
}

impl CheckOutcome {
    /// Whether the check passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, CheckOutcome::Passed { .. })
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&AppError> {
        match self {
            CheckOutcome::Passed { .. } => None,
            CheckOutcome::Failed(err) => Some(err),
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Passed { url, report } => {
                write!(f, "Connection successful to {}\n\nQuery Results:\n{}", url, report)
            }
            CheckOutcome::Failed(err) => write!(f, "{}", err),
        }
    }
}

/// Most recent check outcome for a connection. Overwritten by every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// When the check finished.
    pub timestamp: DateTime<Utc>,
    /// What the check produced.
    pub outcome: CheckOutcome,
}

impl TestResult {
    /// Stamps an outcome with the current time.
    pub fn now(outcome: CheckOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome,
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Last test at {}:\n{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.outcome
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_passed_text() {
        let outcome = CheckOutcome::Passed {
            url: "sqlite::memory:".into(),
            report: "test_value\n1\n".into(),
        };
        assert!(outcome.is_passed());
        assert_eq!(
            outcome.to_string(),
            "Connection successful to sqlite::memory:\n\nQuery Results:\ntest_value\n1\n"
        );
    }

    #[test]
    fn test_failed_text() {
        let outcome = CheckOutcome::Failed(AppError::ConnectionFailure("refused".into()));
        assert!(!outcome.is_passed());
        assert_eq!(outcome.to_string(), "Connection failed: refused");
        assert_eq!(outcome.error().map(AppError::code), Some("CONNECTION_FAILURE"));
    }

    #[test]
    fn test_result_text() {
        let result = TestResult {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            outcome: CheckOutcome::Failed(AppError::QueryFailure("syntax error".into())),
        };
        assert_eq!(
            result.to_string(),
            "Last test at 2024-03-01T12:30:00.000Z:\nQuery failed: syntax error"
        );
    }
}
