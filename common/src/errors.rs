//! Error types shared across the service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Failure categories of the connection monitor.
///
/// Every variant carries the human-readable detail; the category itself is
/// exposed as a stable code through [`AppError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// The URL prefix matches no known driver. Carries the URL.
    #[error("Unsupported database URL: {0}")]
    UnsupportedScheme(String),

    /// The URL resolved to a driver that is not available in this build.
    #[error("Driver not available: {0}")]
    DriverUnavailable(String),

    /// Opening, talking to or closing the database failed.
    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    /// The query was rejected or failed while running.
    #[error("Query failed: {0}")]
    QueryFailure(String),

    /// No live connection is registered under the name.
    #[error("Connection not found or already closed: {0}")]
    NotFound(String),

    /// The request body failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnsupportedScheme(_) => "UNSUPPORTED_SCHEME",
            AppError::DriverUnavailable(_) => "DRIVER_UNAVAILABLE",
            AppError::ConnectionFailure(_) => "CONNECTION_FAILURE",
            AppError::QueryFailure(_) => "QUERY_FAILURE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// HTTP status used when the error is returned directly by a handler.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnsupportedScheme(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DriverUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::ConnectionFailure(_) | AppError::QueryFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
