//! Error responses of the rotation API.
//!
//! Every failure is rendered as a JSON `{"error": "..."}` body:
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | BadRequest | 400 |
//! | Unauthorized | 401 |
//! | NotFound | 404 |
//! | Internal | 500 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ftpgate_protocol::ErrorResponse;
use thiserror::Error;

use crate::credentials::RotationError;

/// Message returned for unparseable request bodies.
pub const INVALID_BODY_MESSAGE: &str =
    "Invalid request body. Required fields: username, new_password";

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (HTTP 400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or wrong credentials (HTTP 401).
    #[error("{0}")]
    Unauthorized(String),

    /// Unknown resource (HTTP 404).
    #[error("{0}")]
    NotFound(String),

    /// Server-side failure (HTTP 500).
    #[error("{0}")]
    Internal(String),
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The invalid-body error.
    pub fn invalid_body() -> Self {
        ApiError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    }
}

impl From<RotationError> for ApiError {
    fn from(err: RotationError) -> Self {
        let message = err.to_string();
        match err {
            RotationError::EmptyPassword
            | RotationError::PasswordTooShort
            | RotationError::InvalidIdentity(_) => ApiError::BadRequest(message),
            RotationError::IncorrectCurrentPassword => ApiError::Unauthorized(message),
            RotationError::Store(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "API request failed");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
