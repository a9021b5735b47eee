//! # LogWriter: lifecycle events as `tracing` records
//!
//! A subscriber that renders every [`Event`] as a structured `tracing` record.
//! Install a `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! INFO  service starting unit="store"
//! ERROR service failed unit="consumer" reason="connection error: refused"
//! INFO  shutdown initiated cause="unit \"consumer\" failed"
//! INFO  service stopped unit="store"
//! WARN  drain deadline exceeded, connections force-closed unit="http" deadline_ms=10000
//! INFO  shutdown complete summary="failure: ..."
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let unit = e.unit_or_dash();
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ServiceStarting => {
                tracing::info!(unit, "service starting");
            }
            EventKind::ServiceExited => {
                tracing::info!(unit, "service start returned");
            }
            EventKind::ServiceFailed => {
                tracing::error!(unit, reason, "service failed");
            }
            EventKind::ServiceStopping => {
                tracing::info!(unit, "service stopping");
            }
            EventKind::ServiceStopped => {
                tracing::info!(unit, "service stopped");
            }
            EventKind::StopFailed => {
                tracing::warn!(unit, reason, "service stop failed");
            }
            EventKind::ListenerBound => {
                let addr = e.addr.map(|a| a.to_string()).unwrap_or_default();
                tracing::info!(unit, %addr, "listening");
            }
            EventKind::ListenerFailed => {
                tracing::error!(unit, reason, "listener failed");
            }
            EventKind::ListenerClosed => {
                tracing::info!(unit, "listener closed");
            }
            EventKind::DrainStarted => {
                tracing::info!(unit, deadline_ms = e.deadline_ms, "draining connections");
            }
            EventKind::DrainCompleted => {
                tracing::info!(unit, "drain complete");
            }
            EventKind::DrainTimedOut => {
                tracing::warn!(
                    unit,
                    deadline_ms = e.deadline_ms,
                    "drain deadline exceeded, connections force-closed"
                );
            }
            EventKind::UnitPanicked => {
                tracing::error!(unit, phase = reason, "unit panicked");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(cause = reason, "shutdown initiated");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(unit, grace_ms = e.deadline_ms, "unit ignored cancellation, aborted");
            }
            EventKind::ShutdownComplete => {
                tracing::info!(summary = reason, "shutdown complete");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
