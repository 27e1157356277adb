//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages and handlers produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and a latency histogram)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Correlation ids from the audit log are attached to request logs
//! - Metric updates are no-ops until a recorder is installed, so tests
//!   need no setup

pub mod logging;
pub mod metrics;
