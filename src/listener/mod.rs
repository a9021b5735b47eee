//! HTTP listener unit.
//!
//! - [`HttpListener`]: binds, serves an axum router and drains under a deadline.

mod http;

pub(crate) use http::drain;
pub use http::{DEFAULT_LISTENER_NAME, HttpListener};
