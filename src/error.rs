//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
/// Storage and crypto failures are logged server-side; their details are
/// never echoed to clients.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error).
    ///
    /// Wraps any sqlx::Error via `#[from]`. Returns HTTP 500 with a generic
    /// message; the underlying cause is logged.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input the caller should correct (empty name, zero slots).
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("{0}")]
    Validation(String),

    /// Semantically invalid request (bad base64, bad QR signature).
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    BadRequest(String),

    /// API key is missing or unknown.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    Unauthorized,

    /// Authenticated, but not the owner of the resource or wrong role.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist.
    ///
    /// Returns HTTP 404 Not Found. The string names the missing resource.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// State prevents the operation (no free slots, duplicate email,
    /// a released ticket moving back to active).
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected internal failure (signing, encoding).
    ///
    /// Returns HTTP 500; the cause is logged, never echoed.
    #[error("{0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Database(ref e) => {
                // Log the driver error; clients get a generic message.
                tracing::error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref cause) => {
                tracing::error!("internal error: {cause}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Validation(ref msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl AppError {
    /// True when the wrapped database error is a unique-constraint violation
    /// on the named constraint.
    ///
    /// Used by check-in to detect an HMAC digest collision (retry with a
    /// fresh ticket id) and by registration to detect a duplicate email.
    pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
        match err {
            sqlx::Error::Database(db) => {
                db.is_unique_violation() && db.constraint() == Some(constraint)
            }
            _ => false,
        }
    }
}
