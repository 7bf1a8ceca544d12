//! Error types for Arandu services
//!
//! Two error surfaces:
//! - `WorkerError`: the pipeline failure taxonomy. Each variant maps 1:1 to a
//!   terminal job/review status transition; no retries.
//! - `AppError`: HTTP-facing errors with status code mapping and a structured
//!   JSON response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Pipeline failure taxonomy.
///
/// The five named kinds carry the user-visible message stored in
/// `error_message`; anything else is `Internal` and logged with full detail.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Repository clone failed: {0}")]
    RepoClone(String),

    #[error("Environment detection failed: {0}")]
    NoEnvironmentDetected(String),

    #[error("Docker build failed: {0}")]
    DockerBuild(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Execution exceeded timeout of {0} seconds")]
    ExecutionTimeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Stable kind label used in terminal status-transition log events
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::RepoClone(_) => "repo_clone_error",
            WorkerError::NoEnvironmentDetected(_) => "no_environment_detected",
            WorkerError::DockerBuild(_) => "docker_build_error",
            WorkerError::Execution(_) => "execution_error",
            WorkerError::ExecutionTimeout(_) => "execution_timeout",
            WorkerError::Internal(_) => "internal_error",
        }
    }
}

impl From<anyhow::Error> for WorkerError {
    fn from(err: anyhow::Error) -> Self {
        WorkerError::Internal(err.to_string())
    }
}

impl From<sea_orm::DbErr> for WorkerError {
    fn from(err: sea_orm::DbErr) -> Self {
        WorkerError::Internal(format!("database error: {err}"))
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Internal(format!("io error: {err}"))
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::Internal(format!("serialization error: {err}"))
    }
}

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidFormat,
    PayloadTooLarge,
    NotFound,
    JobNotFound,
    ReviewNotFound,
    PaperNotFound,
    Conflict,
    RangeNotSatisfiable,
    DatabaseError,
    QueueError,
    UpstreamError,
    InternalError,
}

/// Application error types for the HTTP surface
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    #[error("Review not found: {id}")]
    ReviewNotFound { id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("Range not satisfiable")]
    RangeNotSatisfiable,

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Queue error: {message}")]
    QueueError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::JobNotFound { .. } => ErrorCode::JobNotFound,
            AppError::ReviewNotFound { .. } => ErrorCode::ReviewNotFound,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::RangeNotSatisfiable => ErrorCode::RangeNotSatisfiable,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::QueueError { .. } => ErrorCode::QueueError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            AppError::NotFound { .. }
            | AppError::JobNotFound { .. }
            | AppError::ReviewNotFound { .. }
            | AppError::PaperNotFound { .. } => StatusCode::NOT_FOUND,

            AppError::Duplicate { .. } => StatusCode::CONFLICT,

            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            AppError::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,

            AppError::Database(_) | AppError::Internal { .. } | AppError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            AppError::HttpClient(_) | AppError::QueueError { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// Structured error response for the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(error = %message, code = ?code, status = status.as_u16(), "Server error");
        } else {
            tracing::warn!(error = %message, code = ?code, status = status.as_u16(), "Client error");
        }

        let body = ErrorResponse {
            error: ErrorDetails { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal { message: err.to_string() }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::QueueError { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_error_messages() {
        let err = WorkerError::NoEnvironmentDetected("no manifest found".into());
        assert!(err.to_string().starts_with("Environment detection failed"));

        let err = WorkerError::ExecutionTimeout(1800);
        assert!(err.to_string().contains("exceeded timeout of 1800 seconds"));
    }

    #[test]
    fn test_worker_error_kinds() {
        assert_eq!(WorkerError::RepoClone("x".into()).kind(), "repo_clone_error");
        assert_eq!(WorkerError::DockerBuild("x".into()).kind(), "docker_build_error");
        assert_eq!(WorkerError::ExecutionTimeout(5).kind(), "execution_timeout");
    }

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::JobNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::JobNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_range_error_status() {
        assert_eq!(
            AppError::RangeNotSatisfiable.status_code(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal { message: "boom".into() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
