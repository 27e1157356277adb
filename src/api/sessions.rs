//! Session token issuance and revocation.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;

use crate::access::RequestContext;
use crate::error::ApiError;
use crate::http::AppState;
use crate::observability::metrics;
use crate::session::carrier::{clear_cookie_header, session_cookie_header};

/// `now + ttl_secs`, failing instead of overflowing the calendar.
pub fn session_expiry(now: DateTime<Utc>, ttl_secs: u64) -> Result<DateTime<Utc>, ApiError> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| ApiError::Internal(format!("session ttl {ttl_secs}s out of range")))
}

/// `POST /sessions`: issue a token for the already-authenticated caller.
pub async fn login(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, ApiError> {
    let subject = ctx.require_subject()?;
    let session = &state.config.session;

    let expiry = session_expiry(state.clock.now(), session.ttl_secs)?;
    let token_id = state.tokens.create(subject, expiry)?;

    metrics::record_token_issued();
    tracing::info!(subject = %subject, expiry = %expiry, "Session token issued");

    let mut response = (StatusCode::CREATED, Json(json!({ "token": token_id }))).into_response();
    if let Some(cookie) = session_cookie_header(
        &session.cookie_name,
        &token_id,
        session.ttl_secs,
        session.secure_cookie,
    ) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// `DELETE /sessions`: revoke the token that authenticated this request.
pub async fn logout(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, ApiError> {
    let subject = ctx.require_subject()?;
    if let Some(token_id) = &ctx.token_id {
        state.tokens.revoke(token_id);
        tracing::info!(subject = %subject, "Session token revoked");
    }

    let mut response = Json(json!({})).into_response();
    if let Some(cookie) = clear_cookie_header(&state.config.session.cookie_name) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_ttl_after_now() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, 600).unwrap(), now + TimeDelta::minutes(10));
    }

    #[test]
    fn test_oversized_ttl_is_an_error_not_a_panic() {
        let now = Utc::now();
        assert!(matches!(
            session_expiry(now, 10_000_000_000_000),
            Err(ApiError::Internal(_))
        ));
        assert!(session_expiry(now, u64::MAX).is_err());
    }
}
