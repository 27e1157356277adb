//! User registration.

use axum::{extract::State, response::Response};
use serde::Deserialize;
use serde_json::json;

use crate::access::password::hash_password;
use crate::api::created;
use crate::error::ApiError;
use crate::http::{AppState, JsonBody};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// A letter followed by 1 to 29 letters or digits.
pub fn is_valid_username(username: &str) -> bool {
    let mut chars = username.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && (2..=30).contains(&username.len())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// `POST /users`
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(user): JsonBody<NewUser>,
) -> Result<Response, ApiError> {
    if !is_valid_username(&user.username) {
        return Err(ApiError::validation("invalid username"));
    }
    if user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password = user.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| ApiError::Internal(format!("password hashing task failed: {err}")))?
        .map_err(|err| ApiError::Internal(format!("password hashing failed: {err}")))?;

    state.users.create_user(&user.username, &hash)?;
    tracing::info!(user = %user.username, "User registered");

    Ok(created(
        format!("/users/{}", user.username),
        json!({ "username": user.username }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("b2"));
        assert!(is_valid_username(&format!("a{}", "b".repeat(29))));

        assert!(!is_valid_username(""));
        assert!(!is_valid_username("a"));
        assert!(!is_valid_username("2fast"));
        assert!(!is_valid_username("bob smith"));
        assert!(!is_valid_username("ālice"));
        assert!(!is_valid_username(&format!("a{}", "b".repeat(30))));
    }
}
