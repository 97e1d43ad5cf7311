//! Error type shared by the repository and the HTTP layer.
//!
//! Every failure leaves the service as `{"error": <message>, "code": <CODE>}`
//! with the matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable values of the `code` field.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Grant or tag id with no row
    #[error("{0}")]
    NotFound(String),
    /// Missing or malformed required field
    #[error("{0}")]
    Validation(String),
    /// Unique field already taken
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Database(String),
    #[error("{0}")]
    Internal(String),
    /// Unparseable body, path or query parameter
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, codes::VALIDATION_ERROR),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, codes::BAD_REQUEST),
            AppError::Conflict(_) => (StatusCode::CONFLICT, codes::CONFLICT),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::DATABASE_ERROR),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    pub fn error_code(&self) -> &'static str {
        self.classify().1
    }

    pub fn grant_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Grant {} not found", id))
    }

    pub fn tag_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Tag {} not found", id))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                tracing::debug!("Unique constraint violated: {}", db_err);
                AppError::Conflict(format!("Duplicate value: {}", db_err.message()))
            }
            _ => {
                tracing::error!(error = ?err, "Database operation failed");
                AppError::Database(format!("Database error: {}", err))
            }
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.classify();
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
