use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::DurationError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `DUPLICATE_JOB_NUMBER`, `CONFLICT`, `USERNAME_TAKEN`, `PERSISTENCE_FAILURE`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Job number may contain only letters, digits, and hyphens")]
    pub message: String,
}

/// Application-level error type.
///
/// Enrichment failures never show up here: geocoding and property lookups
/// degrade to "unresolved" and the operation carries on.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    /// An active job already holds this job number.
    DuplicateJobNumber(String),
    Conflict(String),
    UsernameTaken,
    /// The store failed. Surfaced untouched, never retried.
    Persistence(String),
    Internal(String),
}

impl AppError {
    /// Machine-readable code, as sent in [`ErrorBody::code`].
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::TokenMissing => "TOKEN_MISSING",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::PermissionDenied => "PERMISSION_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateJobNumber(_) => "DUPLICATE_JOB_NUMBER",
            AppError::Conflict(_) => "CONFLICT",
            AppError::UsernameTaken => "USERNAME_TAKEN",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let code = self.code();
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::TokenMissing => (StatusCode::UNAUTHORIZED, "Authentication required".into()),
            AppError::TokenInvalid => (StatusCode::UNAUTHORIZED, "Invalid or expired token".into()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".into(),
            ),
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "Insufficient permissions".into()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DuplicateJobNumber(number) => (
                StatusCode::CONFLICT,
                format!("Job number '{number}' already exists"),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::UsernameTaken => (StatusCode::CONFLICT, "Username is already taken".into()),
            AppError::Persistence(detail) => {
                tracing::error!("Persistence failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The data store is unavailable".into(),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".into(),
                )
            }
        };
        (status, ErrorBody { code, message })
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Persistence(msg)
            | AppError::Internal(msg) => write!(f, "{}: {msg}", self.code()),
            AppError::DuplicateJobNumber(number) => write!(f, "{}: {number}", self.code()),
            _ => f.write_str(self.code()),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<DurationError> for AppError {
    fn from(err: DurationError) -> Self {
        AppError::Validation(err.to_string())
    }
}
