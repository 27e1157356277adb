//! Audit trail.
//!
//! # Data Flow
//! ```text
//! authenticated request
//!     → middleware.rs: start record (method, path, subject) → sink
//!     → rest of the pipeline and the handler
//!     → middleware.rs: end record (status), same correlation id → sink
//! ```
//!
//! # Design Decisions
//! - Writes are synchronous and not best-effort: a failed start write
//!   aborts the request before business logic
//! - Records are append-only; retention is someone else's job
//! - The correlation id is echoed to the caller as `X-Request-Id`

pub mod middleware;
pub mod sink;

pub use middleware::{audit_requests, AuditLog, X_REQUEST_ID};
pub use sink::{AuditError, AuditPhase, AuditRecord, AuditSink, FileAuditLog, MemoryAuditLog};
