//! # Placeholder service for external collaborators.
//!
//! [`StubService`] stands in for the store, the message consumer and the generic
//! server: one parametrized implementation, instantiated once per collaborator.
//! It models the resource as a connected flag and follows the [`Service`] contract
//! exactly, so the supervisor's coordination can be exercised end to end.
//!
//! ```text
//! start(ctx): connect ──► wait for ctx cancelled ──► return Ok
//! stop():     first call disconnects, later calls are no-ops
//!
//! idle ──start──► connected ──stop──► released
//!   └───────────────stop────────────────┘
//! ```
//!
//! The resource moves through one atomic state, so a `start` racing a `stop`
//! can never connect after the release.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::services::Service;

const IDLE: u8 = 0;
const CONNECTED: u8 = 1;
const RELEASED: u8 = 2;

/// Parametrized placeholder service.
#[derive(Debug)]
pub struct StubService {
    name: String,
    connect_error: Option<ServiceError>,
    state: AtomicU8,
    stop_calls: AtomicUsize,
}

impl StubService {
    /// Creates a stub that connects successfully.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connect_error: None,
            state: AtomicU8::new(IDLE),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a stub whose start fails with `error` (simulates an unreachable collaborator).
    pub fn failing(name: impl Into<String>, error: ServiceError) -> Self {
        Self {
            connect_error: Some(error),
            ..Self::new(name)
        }
    }

    /// True while the simulated resource is held.
    pub fn is_connected(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CONNECTED
    }

    /// Number of times `stop` was invoked.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Service for StubService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        match self
            .state
            .compare_exchange(IDLE, CONNECTED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => tracing::debug!(service = %self.name, "stub resource acquired"),
            // released before start ran: nothing to hold
            Err(RELEASED) => return Ok(()),
            Err(_) => {}
        }

        ctx.cancelled().await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.swap(RELEASED, Ordering::SeqCst) == CONNECTED {
            tracing::debug!(service = %self.name, "stub resource released");
        }
        Ok(())
    }
}
