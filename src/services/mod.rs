//! # Service abstractions.
//!
//! This module provides the service-related types:
//! - [`Service`] - trait for units with an independent start/stop lifecycle
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`ServiceFn`] - closure-backed service implementation
//! - [`StubService`] - placeholder for an external collaborator (store, consumer, ...)

mod service;
mod service_fn;
mod stub;

pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
pub use stub::StubService;
