//! Shared building blocks for the connection monitor.
//!
//! Configuration, the error type, domain models and the HTTP response envelope.

pub mod config;
pub mod errors;
pub mod models;
pub mod response;
