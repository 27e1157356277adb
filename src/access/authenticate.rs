//! Authentication middleware.
//!
//! Binds the caller's identity into the [`RequestContext`] and never
//! rejects: a request with no credential, a bad password or an unknown
//! token simply continues anonymously. Rejection belongs to the route
//! gates.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::access::context::RequestContext;
use crate::access::password::verify_password;
use crate::session::{extract_credential, Credential, TokenStore};
use crate::store::UserStore;

/// State for the authentication stage.
#[derive(Clone)]
pub struct Authenticator {
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
    cookie_name: String,
}

impl Authenticator {
    pub fn new(tokens: Arc<dyn TokenStore>, users: Arc<dyn UserStore>, cookie_name: impl Into<String>) -> Self {
        Self {
            tokens,
            users,
            cookie_name: cookie_name.into(),
        }
    }

    /// Resolve a credential to a request context.
    pub fn resolve(&self, credential: Option<Credential>) -> RequestContext {
        match credential {
            None => RequestContext::anonymous(),
            Some(Credential::Token(token_id)) => match self.tokens.read(&token_id) {
                Some(session) => RequestContext {
                    subject: Some(session.subject),
                    token_id: Some(token_id),
                    correlation_id: None,
                },
                None => RequestContext::anonymous(),
            },
            Some(Credential::Basic { username, password }) => {
                let stored = match self.users.password_hash(&username) {
                    Ok(stored) => stored,
                    Err(err) => {
                        tracing::error!(error = %err, "User lookup failed during authentication");
                        None
                    }
                };
                match stored {
                    Some(hash) if verify_password(&password, &hash) => RequestContext::authenticated(username),
                    _ => {
                        tracing::debug!(user = %username, "Password authentication failed");
                        RequestContext::anonymous()
                    }
                }
            }
        }
    }
}

/// First pipeline stage: attach a [`RequestContext`] to every request.
pub async fn authenticate(
    State(auth): State<Authenticator>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let credential = extract_credential(request.headers(), &auth.cookie_name);

    let ctx = match credential {
        // Argon2 verification blocks; run it off the async workers.
        Some(basic @ Credential::Basic { .. }) => {
            let auth = auth.clone();
            match tokio::task::spawn_blocking(move || auth.resolve(Some(basic))).await {
                Ok(ctx) => ctx,
                Err(err) => {
                    tracing::error!(error = %err, "Password verification task failed");
                    RequestContext::anonymous()
                }
            }
        }
        other => auth.resolve(other),
    };

    if let Some(subject) = &ctx.subject {
        tracing::debug!(subject = %subject, "Request authenticated");
    }
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::password::hash_password;
    use crate::clock::{Clock, ManualClock};
    use crate::session::MemoryTokenStore;
    use crate::store::MemoryStore;
    use chrono::{TimeDelta, Utc};

    fn setup() -> (Authenticator, MemoryTokenStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tokens = MemoryTokenStore::new(clock.clone());
        let users = Arc::new(MemoryStore::new());
        users.create_user("alice", &hash_password("password123").unwrap()).unwrap();
        let auth = Authenticator::new(Arc::new(tokens.clone()), users, "natter_token");
        (auth, tokens, clock)
    }

    #[test]
    fn test_no_credential_is_anonymous() {
        let (auth, _, _) = setup();
        assert_eq!(auth.resolve(None), RequestContext::anonymous());
    }

    #[test]
    fn test_valid_token_binds_subject() {
        let (auth, tokens, clock) = setup();
        let id = tokens.create("alice", clock.now() + TimeDelta::minutes(10)).unwrap();
        let ctx = auth.resolve(Some(Credential::Token(id.clone())));
        assert_eq!(ctx.subject.as_deref(), Some("alice"));
        assert_eq!(ctx.token_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_expired_token_is_anonymous() {
        let (auth, tokens, clock) = setup();
        let id = tokens.create("alice", clock.now() + TimeDelta::minutes(10)).unwrap();
        clock.advance(TimeDelta::minutes(11));
        assert_eq!(auth.resolve(Some(Credential::Token(id))), RequestContext::anonymous());
    }

    #[test]
    fn test_password_check() {
        let (auth, _, _) = setup();
        let good = Credential::Basic { username: "alice".into(), password: "password123".into() };
        let bad = Credential::Basic { username: "alice".into(), password: "password124".into() };
        let unknown = Credential::Basic { username: "carol".into(), password: "password123".into() };

        assert_eq!(auth.resolve(Some(good)).subject.as_deref(), Some("alice"));
        assert_eq!(auth.resolve(Some(bad)).subject, None);
        assert_eq!(auth.resolve(Some(unknown)).subject, None);
    }
}
