//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (one shared token bucket)
//!     → content_type.rs (JSON bodies only)
//!     → routing and authorization
//!
//! Outgoing response:
//!     → headers.rs (fixed hardening headers, always)
//! ```
//!
//! # Design Decisions
//! - Admission control is global, not per caller
//! - Cheap preconditions run before any store lookups
//! - Fail closed: reject on any security check failure

pub mod content_type;
pub mod headers;
pub mod rate_limit;

pub use content_type::require_json;
pub use headers::harden_response;
pub use rate_limit::{admission_control, RateLimiter};
