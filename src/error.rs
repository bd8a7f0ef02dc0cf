use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::state_machine::{ApplyError, InvalidTransition},
};

/// Errors that can occur in service and engine operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend rejected the operation.
    #[error("storage error: {0}")]
    Unavailable(#[source] StorageError),
    /// Unknown session, player, question or quiz.
    #[error("not found: {0}")]
    NotFound(String),
    /// Event received while the session is in a state that does not accept it.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// Second answer from the same player for the same question.
    #[error("duplicate answer: {0}")]
    DuplicateAnswer(String),
    /// Malformed or out-of-range payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Caller exceeded its request budget.
    #[error("rate limit exceeded")]
    RateLimited,
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl ServiceError {
    /// Message safe to show to a client; details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ServiceError::Unavailable(_) | ServiceError::Timeout => "service unavailable",
            ServiceError::NotFound(_) => "not found",
            ServiceError::InvalidTransition(_) => "action not allowed right now",
            ServiceError::DuplicateAnswer(_) => "answer rejected",
            ServiceError::InvalidInput(_) => "invalid request",
            ServiceError::RateLimited => "too many requests",
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidTransition(err.to_string())
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::PhaseMismatch { expected, actual } => {
                ServiceError::InvalidTransition(format!(
                    "session changed during transition (expected {expected:?}, got {actual:?})"
                ))
            }
            ApplyError::VersionMismatch { expected, actual } => {
                ServiceError::InvalidTransition(format!(
                    "session version mismatch during transition (expected {expected}, got {actual})"
                ))
            }
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Caller exceeded its request budget.
    #[error("too many requests")]
    TooManyRequests,
    /// Service unavailable or timed out.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(StorageError::JoinCodeTaken(code)) => {
                AppError::Conflict(format!("join code `{code}` is already in use"))
            }
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidTransition(message) | ServiceError::DuplicateAnswer(message) => {
                AppError::Conflict(message)
            }
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::RateLimited => AppError::TooManyRequests,
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
