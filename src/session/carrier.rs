//! Credential extraction and the session cookie.
//!
//! Carriers are checked in a fixed order: the `Authorization` header
//! (`Basic` or `Bearer`), then the session cookie.

use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// A credential presented by the caller.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// HTTP Basic username and password.
    Basic { username: String, password: String },
    /// An opaque session token id.
    Token(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Credential::Token(_) => f.write_str("Token(..)"),
        }
    }
}

/// Pull the caller's credential out of the request headers.
///
/// Returns `None` when nothing usable is present. A malformed
/// `Authorization` header counts as absent.
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<Credential> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        return match value.to_str().ok().and_then(parse_authorization) {
            Some(credential) => Some(credential),
            None => {
                tracing::debug!("Ignoring malformed Authorization header");
                None
            }
        };
    }
    session_cookie(headers, cookie_name).map(Credential::Token)
}

fn parse_authorization(value: &str) -> Option<Credential> {
    let (scheme, rest) = value.trim().split_once(' ')?;
    let rest = rest.trim();
    if scheme.eq_ignore_ascii_case("basic") {
        let decoded = STANDARD.decode(rest).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Credential::Basic {
            username: username.to_string(),
            password: password.to_string(),
        })
    } else if scheme.eq_ignore_ascii_case("bearer") && !rest.is_empty() {
        Some(Credential::Token(rest.to_string()))
    } else {
        None
    }
}

/// Value of the named cookie, searching every `Cookie` header.
pub fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value that installs the session token.
pub fn session_cookie_header(
    cookie_name: &str,
    token_id: &str,
    max_age_secs: u64,
    secure: bool,
) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{cookie_name}={token_id}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Strict{secure}"
    ))
    .ok()
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_cookie_header(cookie_name: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{cookie_name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict"
    ))
    .ok()
}
