//! Request auditing.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::access::RequestContext;
use crate::audit::sink::{AuditError, AuditPhase, AuditRecord, AuditSink};
use crate::clock::Clock;
use crate::error::ApiError;
use crate::observability::metrics;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Writes the start and end record of every request.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, clock }
    }

    /// Persist the start record and return the new correlation id.
    pub fn request_start(&self, method: &str, path: &str, subject: Option<&str>) -> Result<Uuid, AuditError> {
        let correlation_id = Uuid::new_v4();
        self.sink.append(&AuditRecord {
            correlation_id,
            phase: AuditPhase::Start,
            method: method.to_string(),
            path: path.to_string(),
            subject: subject.map(str::to_string),
            status: None,
            time: self.clock.now(),
        })?;
        Ok(correlation_id)
    }

    /// Persist the terminal status for `correlation_id`.
    pub fn request_end(
        &self,
        correlation_id: Uuid,
        method: &str,
        path: &str,
        subject: Option<&str>,
        status: u16,
    ) -> Result<(), AuditError> {
        self.sink.append(&AuditRecord {
            correlation_id,
            phase: AuditPhase::End,
            method: method.to_string(),
            path: path.to_string(),
            subject: subject.map(str::to_string),
            status: Some(status),
            time: self.clock.now(),
        })
    }

    /// Records from the last `window`.
    pub fn recent(&self, window: TimeDelta) -> Result<Vec<AuditRecord>, AuditError> {
        self.sink.read_since(self.since(window))
    }

    /// Start of `window`; a window reaching past the calendar covers everything.
    fn since(&self, window: TimeDelta) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Pipeline stage wrapping everything after authentication.
///
/// A failed start write aborts the request before any later stage runs.
/// A failed end write replaces the response with a 500.
pub async fn audit_requests(
    State(audit): State<AuditLog>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let mut ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    let subject = ctx.subject.clone();

    let correlation_id = match audit.request_start(&method, &path, subject.as_deref()) {
        Ok(id) => id,
        Err(err) => {
            metrics::record_audit_failure("start");
            return ApiError::Internal(format!("audit start write failed: {err}")).into_response();
        }
    };

    ctx.correlation_id = Some(correlation_id);
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    let status = response.status().as_u16();

    if let Err(err) = audit.request_end(correlation_id, &method, &path, subject.as_deref(), status) {
        metrics::record_audit_failure("end");
        response = ApiError::Internal(format!("audit end write failed for {correlation_id}: {err}"))
            .into_response();
    }

    tracing::info!(
        request_id = %correlation_id,
        method = %method,
        path = %path,
        subject = subject.as_deref().unwrap_or("-"),
        status = response.status().as_u16(),
        "Request completed"
    );
    metrics::record_request(&method, response.status().as_u16(), started);

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
