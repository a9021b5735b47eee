//! # Service contract.
//!
//! A [`Service`] is a unit of work with a start phase and a stop phase. The
//! supervisor invokes each exactly once:
//!
//! ```text
//! launch() ──► start(ctx) ... runs until failure or ctx cancelled
//!          └─► ctx cancelled ──► stop()
//! ```
//!
//! ## Rules
//! - `start` must suspend on "work to do **or** cancellation", never exclusively on one,
//!   and return within the supervisor's grace period once `ctx` is cancelled.
//! - `stop` must be callable even if `start` never completed, and a second call must be
//!   a no-op (the supervisor calls it once; embedders and tests may call it again).
//! - Returning [`ServiceError::Canceled`] from `start` is a graceful exit.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// # Unit with independent start/stop lifecycle.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use servicevisor::{Service, ServiceError};
///
/// struct Cache { open: AtomicBool }
///
/// #[async_trait]
/// impl Service for Cache {
///     fn name(&self) -> &str { "cache" }
///
///     async fn start(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
///         self.open.store(true, Ordering::SeqCst);
///         ctx.cancelled().await;
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), ServiceError> {
///         self.open.store(false, Ordering::SeqCst);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable service name (used for diagnostics and outcome keys).
    fn name(&self) -> &str;

    /// Establishes the service's resource and runs until failure or cancellation.
    async fn start(&self, ctx: CancellationToken) -> Result<(), ServiceError>;

    /// Releases the service's resource. Idempotent.
    async fn stop(&self) -> Result<(), ServiceError>;
}
