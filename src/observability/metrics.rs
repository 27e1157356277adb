//! Metrics collection and exposition.
//!
//! # Metrics
//! - `natter_requests_total` (counter): completed requests by method, status
//! - `natter_request_duration_seconds` (histogram): latency distribution
//! - `natter_rate_limited_total` (counter): admission-control rejections
//! - `natter_auth_rejections_total` (counter): gate rejections by reason
//! - `natter_tokens_issued_total` (counter): session tokens created
//! - `natter_audit_failures_total` (counter): failed audit writes by phase

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Serve Prometheus metrics on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "natter_requests_total",
        "method" => method.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("natter_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("natter_rate_limited_total").increment(1);
}

pub fn record_auth_rejection(reason: &'static str) {
    counter!("natter_auth_rejections_total", "reason" => reason).increment(1);
}

pub fn record_token_issued() {
    counter!("natter_tokens_issued_total").increment(1);
}

pub fn record_audit_failure(phase: &'static str) {
    counter!("natter_audit_failures_total", "phase" => phase).increment(1);
}
