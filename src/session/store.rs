//! Session token storage.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use std::sync::Arc;
use thiserror::Error;

use crate::clock::Clock;

/// Random bytes per token id (160 bits).
const TOKEN_BYTES: usize = 20;

/// A live session bound to a token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub subject: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// The generated id matched a live token.
    #[error("token id collision")]
    Collision,
}

/// Owner of every session token.
pub trait TokenStore: Send + Sync {
    /// Store a new session and return its freshly generated id.
    fn create(&self, subject: &str, expiry: DateTime<Utc>) -> Result<String, TokenError>;

    /// The session for `token_id` if it exists and has not expired.
    ///
    /// Missing and expired tokens are indistinguishable to the caller.
    fn read(&self, token_id: &str) -> Option<Session>;

    /// Remove a token. Revoking an unknown token is not an error.
    fn revoke(&self, token_id: &str);

    /// Drop every expired token, returning how many were removed.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Generate an unguessable, URL-safe token id.
pub fn generate_token_id() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Concurrent in-memory token store.
#[derive(Clone)]
pub struct MemoryTokenStore {
    inner: Arc<DashMap<String, Session>>,
    clock: Arc<dyn Clock>,
}

impl MemoryTokenStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of stored tokens, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn insert(&self, token_id: String, session: Session) -> Result<String, TokenError> {
        match self.inner.entry(token_id) {
            Entry::Occupied(_) => Err(TokenError::Collision),
            Entry::Vacant(slot) => {
                let token_id = slot.key().clone();
                slot.insert(session);
                Ok(token_id)
            }
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn create(&self, subject: &str, expiry: DateTime<Utc>) -> Result<String, TokenError> {
        let session = Session {
            subject: subject.to_string(),
            expiry,
        };
        self.insert(generate_token_id(), session)
    }

    fn read(&self, token_id: &str) -> Option<Session> {
        let now = self.clock.now();
        let session = self.inner.get(token_id).map(|r| r.value().clone())?;
        if now < session.expiry {
            return Some(session);
        }
        // Lazily drop it, unless a fresh session took the id meanwhile.
        self.inner.remove_if(token_id, |_, s| s.expiry <= now);
        None
    }

    fn revoke(&self, token_id: &str) {
        self.inner.remove(token_id);
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.inner.len();
        self.inner.retain(|_, session| now < session.expiry);
        before.saturating_sub(self.inner.len())
    }
}
