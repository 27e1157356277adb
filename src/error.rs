//! Request-level error taxonomy and the JSON error envelope.
//!
//! Every pipeline stage and handler fails with an [`ApiError`]. The
//! response body is always `{"error": "<message>"}`; internal details are
//! logged and never echoed to the caller.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::audit::AuditError;
use crate::session::TokenError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid subject is bound to the request.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The subject lacks a required permission bit.
    #[error("permission denied")]
    AuthorizationDenied,

    /// The shared rate limiter had no permit available.
    #[error("too many requests")]
    AdmissionRejected { retry_after_secs: u64 },

    /// A state-changing request did not declare a JSON body.
    #[error("Only application/json supported")]
    UnsupportedMediaType,

    /// Malformed business input.
    #[error("{0}")]
    Validation(String),

    /// The request outlived the configured timeout.
    #[error("request timed out")]
    Timeout,

    #[error("not found")]
    NotFound,

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::AuthorizationDenied => StatusCode::FORBIDDEN,
            ApiError::AdmissionRejected { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }

        let mut response = (self.status(), Json(json!({ "error": self.to_string() }))).into_response();
        let headers = response.headers_mut();
        match self {
            ApiError::AdmissionRejected { retry_after_secs } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            ApiError::AuthenticationRequired => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"/\", charset=\"UTF-8\""),
                );
            }
            _ => {}
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Duplicate(what) => ApiError::Validation(format!("{what} already exists")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
