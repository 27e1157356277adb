//! Space creation and membership.

use axum::{extract::State, response::Response, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::{Permissions, PermissionsError, RequestContext};
use crate::api::{created, SpacePath};
use crate::error::ApiError;
use crate::http::{AppState, JsonBody, PathParams};

#[derive(Debug, Deserialize)]
pub struct NewSpace {
    pub name: String,
    pub owner: String,
}

#[derive(Debug, Deserialize)]
pub struct NewMember {
    pub username: String,
    pub permissions: String,
}

/// `POST /spaces`
pub async fn create_space(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(space): JsonBody<NewSpace>,
) -> Result<Response, ApiError> {
    let subject = ctx.require_subject()?;
    if space.name.chars().count() > state.config.limits.max_space_name_len {
        return Err(ApiError::validation("space name too long"));
    }
    if space.owner != subject {
        return Err(ApiError::validation("owner must match authenticated user"));
    }

    let space = state.spaces.create_space(&space.name, &space.owner)?;
    tracing::info!(space_id = space.id, owner = %space.owner, "Space created");

    let uri = format!("/spaces/{}", space.id);
    Ok(created(uri.clone(), json!({ "name": space.name, "uri": uri })))
}

/// `POST /spaces/{space_id}/members`: replace a member's full permission mask.
pub async fn add_member(
    State(state): State<AppState>,
    ctx: RequestContext,
    PathParams(path): PathParams<SpacePath>,
    JsonBody(member): JsonBody<NewMember>,
) -> Result<Json<Value>, ApiError> {
    let perms: Permissions = member
        .permissions
        .parse()
        .map_err(|err: PermissionsError| ApiError::validation(err.to_string()))?;

    state.grants.put_grant(path.space_id, &member.username, perms)?;
    tracing::info!(
        space_id = path.space_id,
        member = %member.username,
        permissions = %perms,
        granted_by = ctx.subject.as_deref().unwrap_or("-"),
        "Member permissions set"
    );

    Ok(Json(json!({
        "username": member.username,
        "permissions": perms.to_string(),
    })))
}
