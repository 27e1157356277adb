//! Session token lifecycle.
//!
//! # Data Flow
//! ```text
//! POST /sessions (authenticated)
//!     → store.rs create(subject, now + ttl) → token id
//!     → carrier.rs Set-Cookie
//!
//! Every request:
//!     carrier.rs (Authorization header or cookie)
//!     → store.rs read(token id) → Session | absent
//! ```
//!
//! # Design Decisions
//! - Token ids are 160 random bits; they carry no data themselves
//! - Expired tokens read as absent, exactly like unknown ones
//! - Expired tokens are dropped lazily on read and by a periodic purge

pub mod carrier;
pub mod store;

pub use carrier::{extract_credential, Credential};
pub use store::{generate_token_id, MemoryTokenStore, Session, TokenError, TokenStore};
