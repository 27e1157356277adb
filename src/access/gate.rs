//! Route-scoped authorization gates.
//!
//! Gates are installed per method on individual routes, so a gate only
//! ever sees requests for the method it was built for:
//!
//! ```ignore
//! let write = require_permission(store.clone(), Method::POST, Permissions::WRITE);
//! Router::new().route(
//!     "/spaces/{space_id}/messages",
//!     post(create_message).route_layer(from_fn_with_state(write, enforce_permission)),
//! );
//! ```

use axum::{
    body::Body,
    extract::{RawPathParams, State},
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::access::context::RequestContext;
use crate::access::permissions::Permissions;
use crate::error::ApiError;
use crate::observability::metrics;
use crate::store::PermissionStore;

/// Route parameter naming the space a request targets.
pub const SPACE_PARAM: &str = "space_id";

/// A permission check bound to one route method and required mask.
#[derive(Clone)]
pub struct PermissionGate {
    store: Arc<dyn PermissionStore>,
    method: Method,
    required: Permissions,
}

/// Build a gate demanding `required` on the space named by the route.
pub fn require_permission(
    store: Arc<dyn PermissionStore>,
    method: Method,
    required: Permissions,
) -> PermissionGate {
    PermissionGate {
        store,
        method,
        required,
    }
}

impl PermissionGate {
    pub fn required(&self) -> Permissions {
        self.required
    }

    /// Decide whether `subject` may act on the space identified by `space_id`.
    pub fn check(&self, subject: Option<&str>, space_id: Option<&str>) -> Result<(), ApiError> {
        let Some(subject) = subject else {
            metrics::record_auth_rejection("unauthenticated");
            return Err(ApiError::AuthenticationRequired);
        };
        let space_id = space_id.ok_or_else(|| {
            ApiError::Internal(format!("route for {} gate has no {SPACE_PARAM} parameter", self.method))
        })?;
        let space_id: u64 = space_id
            .parse()
            .map_err(|_| ApiError::validation("invalid space id"))?;

        match self.store.get_grant(space_id, subject)? {
            Some(granted) if granted.contains(self.required) => Ok(()),
            granted => {
                tracing::warn!(
                    subject = %subject,
                    space_id,
                    method = %self.method,
                    required = %self.required,
                    granted = %granted.unwrap_or_default(),
                    "Permission denied"
                );
                metrics::record_auth_rejection("forbidden");
                Err(ApiError::AuthorizationDenied)
            }
        }
    }
}

/// Middleware running a [`PermissionGate`].
pub async fn enforce_permission(
    State(gate): State<PermissionGate>,
    ctx: RequestContext,
    params: RawPathParams,
    request: Request<Body>,
    next: Next,
) -> Response {
    let space_id = params
        .iter()
        .find(|(name, _)| *name == SPACE_PARAM)
        .map(|(_, value)| value);

    match gate.check(ctx.subject.as_deref(), space_id) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// Middleware rejecting anonymous requests, with no resource lookup.
pub async fn require_authentication(ctx: RequestContext, request: Request<Body>, next: Next) -> Response {
    if ctx.subject.is_none() {
        metrics::record_auth_rejection("unauthenticated");
        return ApiError::AuthenticationRequired.into_response();
    }
    next.run(request).await
}
