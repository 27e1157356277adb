//! Per-request identity carried through the pipeline.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::ApiError;

/// Identity and correlation data attached to every request.
///
/// Inserted by the authenticator, completed by the audit stage and read by
/// the gates and handlers. An anonymous request has `subject == None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated identity, if any.
    pub subject: Option<String>,
    /// The session token that authenticated this request, if any.
    pub token_id: Option<String>,
    /// Links the start and end audit records of this request.
    pub correlation_id: Option<Uuid>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    /// The bound subject, or [`ApiError::AuthenticationRequired`].
    pub fn require_subject(&self) -> Result<&str, ApiError> {
        self.subject.as_deref().ok_or(ApiError::AuthenticationRequired)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
