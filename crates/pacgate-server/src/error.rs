//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pacgate_core::{BridgeError, CoreError, DomainError};
use serde::Serialize;
use thiserror::Error;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Error from the controller or domain set.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request came from a web page that may not drive the API.
    #[error("origin not allowed")]
    ForbiddenOrigin,

    /// The bridge worker is gone.
    #[error("service unavailable")]
    Unavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::Core(e) => ApiError::Core(e),
            BridgeError::Closed => ApiError::Unavailable,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Core(e) => {
                let status = match e {
                    CoreError::SubscriptionInactive => StatusCode::PAYMENT_REQUIRED,
                    CoreError::Domain(DomainError::AlreadyPresent(_)) => StatusCode::CONFLICT,
                    CoreError::Domain(_) => StatusCode::BAD_REQUEST,
                    CoreError::NetworkUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CoreError::NotSignedIn | CoreError::Backend(_) => StatusCode::UNAUTHORIZED,
                    CoreError::ConfigurationApply(_) | CoreError::Persistence(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.code())
            }
            ApiError::ForbiddenOrigin => (StatusCode::FORBIDDEN, "forbidden_origin"),
            ApiError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
