//! HTTP surface: router, pipeline wiring and extractors.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum router + pipeline layers)
//!     → extract.rs (typed params and bodies, enveloped rejections)
//!     → api handlers
//! ```

pub mod extract;
pub mod server;

pub use extract::{JsonBody, PathParams};
pub use server::{build_router, shutdown_signal, AppState, HttpServer, Stores};
