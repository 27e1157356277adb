//! Identity and permission enforcement.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → authenticate.rs (credential → RequestContext, never rejects)
//!
//! Protected routes:
//!     → gate.rs require_authentication (subject bound?)
//!     → gate.rs require_permission (grant ⊇ required mask?)
//! ```
//!
//! # Design Decisions
//! - Anonymous requests are an explicit `subject: None`, not an error
//! - Permission checks test bit membership, never string equality
//! - Gates are values built by a factory, one per (route, method)

pub mod authenticate;
pub mod context;
pub mod gate;
pub mod password;
pub mod permissions;

pub use authenticate::{authenticate, Authenticator};
pub use context::RequestContext;
pub use gate::{enforce_permission, require_authentication, require_permission, PermissionGate};
pub use permissions::{Permissions, PermissionsError};
