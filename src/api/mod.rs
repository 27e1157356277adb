//! Business handlers for users, sessions, spaces, messages and the audit log.
//!
//! Handlers assume the pipeline already authenticated the caller and, for
//! space routes, checked the permission gate. They still read the subject
//! from the [`RequestContext`](crate::access::RequestContext) and never trust
//! identities named in request bodies.

pub mod logs;
pub mod messages;
pub mod sessions;
pub mod spaces;
pub mod users;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

/// Route parameters of `/spaces/{space_id}/...`.
#[derive(Debug, Deserialize)]
pub struct SpacePath {
    pub space_id: u64,
}

/// Route parameters of `/spaces/{space_id}/messages/{msg_id}`.
#[derive(Debug, Deserialize)]
pub struct MessagePath {
    pub space_id: u64,
    pub msg_id: u64,
}

/// `201 Created` with a `Location` header.
fn created(uri: String, body: Value) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, uri)], Json(body)).into_response()
}
