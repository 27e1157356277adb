//! Audit log read-back.

use axum::{extract::State, Json};
use chrono::TimeDelta;

use crate::audit::AuditRecord;
use crate::error::ApiError;
use crate::http::AppState;

/// `GET /logs`: audit records inside the configured window, oldest first.
pub async fn read_audit_log(State(state): State<AppState>) -> Result<Json<Vec<AuditRecord>>, ApiError> {
    let secs = state.config.audit.read_window_secs;
    let window = i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| ApiError::Internal(format!("audit read window {secs}s out of range")))?;
    Ok(Json(state.audit.recent(window)?))
}
