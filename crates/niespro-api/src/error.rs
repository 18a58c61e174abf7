//! NiesPro API: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use niespro_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Event store setup failed.
    #[error("event store error: {0}")]
    Store(#[from] DomainError),

    /// Tracing or OTLP exporter setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Whether retrying the same action may succeed.
    pub retryable: bool,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            DomainError::AggregateNotFound(_) => {
                (StatusCode::NOT_FOUND, "aggregate_not_found", self.0.to_string())
            }
            DomainError::ConcurrencyConflict { .. } => (
                StatusCode::CONFLICT,
                "concurrency_conflict",
                format!(
                    "the order was changed by another request, please retry your action ({})",
                    self.0
                ),
            ),
            DomainError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "validation_error", self.0.to_string())
            }
            DomainError::Serialization(_) => {
                error!(error = %self.0, "event serialization failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "serialization_error",
                    self.0.to_string(),
                )
            }
            DomainError::StorageUnavailable(_) => {
                error!(error = %self.0, "event store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage_unavailable",
                    self.0.to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code,
            message,
            retryable: self.0.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}
