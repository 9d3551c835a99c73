/// Unified error types for keygate
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AuthError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed request fields, malformed entity references,
    /// invalid sessions on refresh
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bearer-token verification failures
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Target record missing or not matching its ownership/validity predicate
    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent uniqueness violation on account creation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Startup-time configuration errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Token signing errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Wire error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AuthError::InvalidArgument(_) | AuthError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidArgument",
                self.to_string(),
            ),
            AuthError::Unauthenticated(_) | AuthError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "Unauthenticated",
                self.to_string(),
            ),
            AuthError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            AuthError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Conflict",
                self.to_string(),
            ),
            AuthError::Database(_) | AuthError::Internal(_) | AuthError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type AuthResult<T> = Result<T, AuthError>;
