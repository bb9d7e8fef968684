//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use initgate_core::Rejection;
use serde::Serialize;
use thiserror::Error;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Init data rejected: {0}")]
    Rejected(Rejection),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Rejected(rejection) => match rejection {
                Rejection::MissingHash | Rejection::MalformedInput(_) | Rejection::CryptoError(_) => {
                    StatusCode::BAD_REQUEST
                }
                Rejection::SignatureMismatch
                | Rejection::Stale { .. }
                | Rejection::NotYetValid { .. }
                | Rejection::AlreadyProcessed => StatusCode::UNAUTHORIZED,
                Rejection::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (code, message, retryable) = match &self {
            ApiError::BadRequest(msg) => ("BAD_REQUEST", msg.clone(), false),
            ApiError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone(), false),
            // Store details stay in the logs
            ApiError::Rejected(Rejection::StorageUnavailable(_)) => (
                "STORAGE_UNAVAILABLE",
                "Verification temporarily unavailable".to_string(),
                true,
            ),
            ApiError::Rejected(rejection) => (rejection.code(), rejection.to_string(), false),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            retryable,
        };

        (status, Json(body)).into_response()
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        ApiError::Rejected(rejection)
    }
}
