//! Shared data models.

pub mod check;
pub mod connection;
pub mod query;

// Re-export commonly used types
pub use check::{CheckOutcome, TestResult};
pub use connection::ConnectionConfig;
pub use query::ResultTable;
