//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;

use natter_api::audit::{AuditLog, AuditSink, MemoryAuditLog};
use natter_api::clock::{Clock, ManualClock};
use natter_api::config::NatterConfig;
use natter_api::http::{build_router, AppState, Stores};
use natter_api::security::RateLimiter;
use natter_api::session::MemoryTokenStore;
use natter_api::store::{MemoryStore, SpaceStore};

/// A fully wired application driven by a manual clock.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub audit: Arc<MemoryAuditLog>,
    /// The concrete store behind `state.spaces`, `state.grants` and `state.users`.
    pub store: Arc<MemoryStore>,
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Defaults with rate limiting off, so tests can send bursts.
pub fn test_config() -> NatterConfig {
    let mut config = NatterConfig::default();
    config.rate_limit.enabled = false;
    config
}

pub fn test_app() -> TestApp {
    test_app_with(test_config())
}

pub fn test_app_with(config: NatterConfig) -> TestApp {
    let audit = Arc::new(MemoryAuditLog::new());
    assemble(config, audit.clone(), audit)
}

/// An app whose audit writes go to `sink`; `audit` stays empty.
pub fn test_app_with_sink(config: NatterConfig, sink: Arc<dyn AuditSink>) -> TestApp {
    assemble(config, sink, Arc::new(MemoryAuditLog::new()))
}

fn assemble(config: NatterConfig, sink: Arc<dyn AuditSink>, audit: Arc<MemoryAuditLog>) -> TestApp {
    let clock = Arc::new(ManualClock::new(epoch()));
    let store = Arc::new(MemoryStore::new());
    let stores = Stores {
        spaces: store.clone(),
        grants: store.clone(),
        users: store.clone(),
        tokens: Arc::new(MemoryTokenStore::new(clock.clone())),
    };
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit, clock.clone()));
    let audit_log = AuditLog::new(sink, clock.clone());
    let state = AppState::new(config, clock.clone(), stores, limiter, audit_log);
    TestApp {
        router: build_router(state.clone()),
        state,
        clock,
        audit,
        store,
    }
}

impl TestApp {
    /// Issue a token for `subject` valid for ten minutes.
    pub fn token_for(&self, subject: &str) -> String {
        self.state
            .tokens
            .create(subject, self.clock.now() + TimeDelta::minutes(10))
            .unwrap()
    }

    /// Create a space owned by `owner` directly in the store.
    pub fn space_owned_by(&self, owner: &str) -> u64 {
        self.store.create_space("test space", owner).unwrap().id
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// JSON request with an optional `Authorization` header.
pub fn json_request(method: &str, uri: &str, authorization: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Bodiless request with an optional `Authorization` header.
pub fn request(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
