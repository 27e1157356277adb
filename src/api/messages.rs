//! Posting, listing, reading and moderating messages.

use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::access::RequestContext;
use crate::api::{created, MessagePath, SpacePath};
use crate::error::ApiError;
use crate::http::{AppState, JsonBody, PathParams};
use crate::store::Message;

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    pub author: String,
    pub message: String,
}

fn message_json(message: &Message) -> Value {
    json!({
        "author": message.author,
        "time": message.time.to_rfc3339(),
        "message": message.text,
        "uri": message.uri(),
    })
}

/// `POST /spaces/{space_id}/messages`
pub async fn create_message(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParams(path): PathParams<SpacePath>,
    JsonBody(body): JsonBody<NewMessage>,
) -> Result<Response, ApiError> {
    let subject = ctx.require_subject()?;
    if body.author != subject {
        return Err(ApiError::validation("author must match authenticated user"));
    }
    if body.message.chars().count() > state.config.limits.max_message_len {
        return Err(ApiError::validation("message is too long"));
    }

    let message = state
        .spaces
        .insert_message(path.space_id, &body.author, state.clock.now(), &body.message)?;
    let uri = message.uri();
    Ok(created(uri.clone(), json!({ "uri": uri })))
}

/// `GET /spaces/{space_id}/messages[?since=<RFC 3339>]`: URIs of recent messages.
pub async fn list_messages(
    State(state): State<AppState>,
    PathParams(path): PathParams<SpacePath>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let since = match query.get("since") {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|_| ApiError::validation("since must be an RFC 3339 timestamp"))?
            .with_timezone(&Utc),
        None => state.clock.now() - TimeDelta::days(1),
    };

    let uris = state
        .spaces
        .messages_since(path.space_id, since)?
        .iter()
        .map(Message::uri)
        .collect();
    Ok(Json(uris))
}

/// `GET /spaces/{space_id}/messages/{msg_id}`
pub async fn read_message(
    State(state): State<AppState>,
    PathParams(path): PathParams<MessagePath>,
) -> Result<Json<Value>, ApiError> {
    let message = state.spaces.message(path.space_id, path.msg_id)?;
    Ok(Json(message_json(&message)))
}

/// `DELETE /spaces/{space_id}/messages/{msg_id}`: moderator removal.
pub async fn delete_message(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParams(path): PathParams<MessagePath>,
) -> Result<Json<Value>, ApiError> {
    state.spaces.delete_message(path.space_id, path.msg_id)?;
    tracing::info!(
        space_id = path.space_id,
        msg_id = path.msg_id,
        moderator = ctx.subject.as_deref().unwrap_or("-"),
        "Message deleted"
    );
    Ok(Json(json!({})))
}
