//! # Closure-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps two closures: `start: Fn(CancellationToken) -> Fut` and
//! `stop: Fn() -> Fut`. Each call produces a fresh future, so no state is shared
//! between invocations unless the closures capture an `Arc<...>` explicitly.
//!
//! `ServiceFn` makes no idempotence promise of its own: the `stop` closure must
//! tolerate a second call.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use servicevisor::{ServiceError, ServiceFn, ServiceRef};
//!
//! let svc: ServiceRef = ServiceFn::arc(
//!     "worker",
//!     |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, ServiceError>(())
//!     },
//!     || async { Ok::<_, ServiceError>(()) },
//! );
//!
//! assert_eq!(svc.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::services::Service;

/// Closure-backed service implementation.
pub struct ServiceFn<S, T> {
    name: Cow<'static, str>,
    start: S,
    stop: T,
}

impl<S, T> ServiceFn<S, T> {
    /// Creates a new closure-backed service.
    ///
    /// Prefer [`ServiceFn::arc`] when you immediately need a [`ServiceRef`](crate::ServiceRef).
    pub fn new(name: impl Into<Cow<'static, str>>, start: S, stop: T) -> Self {
        Self {
            name: name.into(),
            start,
            stop,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, start: S, stop: T) -> Arc<Self> {
        Arc::new(Self::new(name, start, stop))
    }
}

#[async_trait]
impl<S, SFut, T, TFut> Service for ServiceFn<S, T>
where
    S: Fn(CancellationToken) -> SFut + Send + Sync + 'static,
    SFut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    T: Fn() -> TFut + Send + Sync + 'static,
    TFut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        (self.start)(ctx).await
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        (self.stop)().await
    }
}
