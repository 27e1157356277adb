//! Natter API: access-control core for a multi-tenant messaging service.
//!
//! Every request flows through one fixed pipeline:
//!
//! ```text
//! authenticate → audit start → rate limit → content type → authorize
//!     → handler → audit end → security headers
//! ```

pub mod access;
pub mod api;
pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod security;
pub mod session;
pub mod store;

pub use config::schema::NatterConfig;
pub use error::ApiError;
pub use http::{AppState, HttpServer};
