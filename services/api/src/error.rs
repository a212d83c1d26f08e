//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use training_core::ports::PortError;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request carried no usable caller identity.
    #[error("Authentication required")]
    Unauthorized,

    /// The request could not be decoded (bad JSON, query string or path segment).
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Stable, machine-readable kind: `not_found`, `validation_error`, `conflict`,
    /// `unauthorized` or `internal_error`.
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Port(PortError::NotFound(msg)) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Port(PortError::Validation(msg)) | ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg)
            }
            ApiError::Port(PortError::Conflict(msg)) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "A valid x-user-id header is required".to_string(),
            ),
            other => {
                tracing::error!(error = %other, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: kind.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
