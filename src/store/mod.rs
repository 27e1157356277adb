//! Persistence for users, spaces, messages and permission grants.
//!
//! # Responsibilities
//! - Permission grants keyed by (space, user), read by the authorizer
//! - Password hashes for registered users, read by the authenticator
//! - Spaces and their messages, used by the business handlers
//!
//! # Design Decisions
//! - The authorizer, authenticator and handlers only see the narrow
//!   [`PermissionStore`], [`UserStore`] and [`SpaceStore`] traits
//! - Multi-row writes (space + owner grant) run inside one transaction
//! - Single-row writes rely on the store's own key uniqueness

pub mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::access::Permissions;

pub use memory::{MemoryStore, Transaction};

/// Errors raised by the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key was already taken.
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("record not found")]
    NotFound,

    /// A transaction body asked for a rollback.
    #[error("transaction aborted: {0}")]
    Aborted(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// A container of messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub id: u64,
    pub name: String,
    pub owner: String,
}

/// A message posted to a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub space_id: u64,
    pub id: u64,
    pub author: String,
    pub time: DateTime<Utc>,
    pub text: String,
}

impl Message {
    pub fn uri(&self) -> String {
        format!("/spaces/{}/messages/{}", self.space_id, self.id)
    }
}

/// Grants of permission masks per (space, user).
pub trait PermissionStore: Send + Sync {
    /// The caller's mask on `space_id`, or `None` when no grant exists.
    fn get_grant(&self, space_id: u64, user_id: &str) -> Result<Option<Permissions>, StoreError>;

    /// Create or fully replace the grant for (`space_id`, `user_id`).
    fn put_grant(&self, space_id: u64, user_id: &str, perms: Permissions) -> Result<(), StoreError>;
}

/// Registered users and their password hashes.
pub trait UserStore: Send + Sync {
    /// Register a user. Fails with [`StoreError::Duplicate`] if the name is taken.
    fn create_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;

    /// The stored PHC hash string for `username`.
    fn password_hash(&self, username: &str) -> Result<Option<String>, StoreError>;
}

/// Spaces and their messages, as the business handlers use them.
pub trait SpaceStore: Send + Sync {
    /// Create a space and grant its owner `rwd`, atomically.
    fn create_space(&self, name: &str, owner: &str) -> Result<Space, StoreError>;

    fn space(&self, space_id: u64) -> Result<Option<Space>, StoreError>;

    /// Append a message. Fails with [`StoreError::NotFound`] if the space is absent.
    fn insert_message(
        &self,
        space_id: u64,
        author: &str,
        time: DateTime<Utc>,
        text: &str,
    ) -> Result<Message, StoreError>;

    /// Messages in `space_id` posted at or after `since`, oldest first.
    fn messages_since(&self, space_id: u64, since: DateTime<Utc>) -> Result<Vec<Message>, StoreError>;

    fn message(&self, space_id: u64, msg_id: u64) -> Result<Message, StoreError>;

    fn delete_message(&self, space_id: u64, msg_id: u64) -> Result<(), StoreError>;
}
