//! # Lifecycle events emitted by the supervisor and its units.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Service events**: start/stop flow of registered services
//! - **Listener events**: bind, close and drain of the HTTP endpoint
//! - **Shutdown events**: cancellation fired, grace exceeded, shutdown complete
//!
//! The [`Event`] struct carries additional metadata such as timestamps, unit name,
//! reasons, bind address and deadlines.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use servicevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServiceFailed)
//!     .with_unit("consumer")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::ServiceFailed);
//! assert_eq!(ev.unit.as_deref(), Some("consumer"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Service events ===
    /// Service start behavior is being invoked.
    ///
    /// Sets:
    /// - `unit`: service name
    ServiceStarting,

    /// Service start behavior returned cleanly (either on its own or after cancellation).
    ///
    /// Sets:
    /// - `unit`: service name
    ServiceExited,

    /// Service start behavior returned an error.
    ///
    /// Sets:
    /// - `unit`: service name
    /// - `reason`: failure message
    ServiceFailed,

    /// Cancellation observed; service stop behavior is being invoked.
    ///
    /// Sets:
    /// - `unit`: service name
    ServiceStopping,

    /// Service stop behavior completed.
    ///
    /// Sets:
    /// - `unit`: service name
    ServiceStopped,

    /// Service stop behavior returned an error.
    ///
    /// Sets:
    /// - `unit`: service name
    /// - `reason`: failure message
    StopFailed,

    // === Listener events ===
    /// HTTP endpoint bound and accepting.
    ///
    /// Sets:
    /// - `unit`: listener name
    /// - `addr`: local socket address
    ListenerBound,

    /// HTTP endpoint failed to bind or stopped accepting unexpectedly.
    ///
    /// Sets:
    /// - `unit`: listener name
    /// - `reason`: failure message
    ListenerFailed,

    /// HTTP endpoint closed after shutdown was requested.
    ///
    /// Sets:
    /// - `unit`: listener name
    ListenerClosed,

    /// Graceful drain started.
    ///
    /// Sets:
    /// - `unit`: listener name
    /// - `deadline_ms`: drain deadline (ms)
    DrainStarted,

    /// All in-flight connections finished within the drain deadline.
    ///
    /// Sets:
    /// - `unit`: listener name
    DrainCompleted,

    /// Drain deadline exceeded; the listener was force-closed.
    ///
    /// Sets:
    /// - `unit`: listener name
    /// - `deadline_ms`: drain deadline (ms)
    DrainTimedOut,

    /// A unit panicked; the panic was contained.
    ///
    /// Sets:
    /// - `unit`: unit name
    /// - `reason`: phase that panicked
    UnitPanicked,

    // === Shutdown events ===
    /// The cancellation signal fired.
    ///
    /// Sets:
    /// - `reason`: shutdown cause
    ShutdownRequested,

    /// A unit did not finish within the grace period and was aborted.
    ///
    /// Sets:
    /// - `unit`: unit name
    /// - `deadline_ms`: grace period (ms)
    GraceExceeded,

    /// Every unit has finished; the outcome set is complete.
    ///
    /// Sets:
    /// - `reason`: aggregate summary
    ShutdownComplete,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the unit (service or listener), if applicable.
    pub unit: Option<Arc<str>>,
    /// Human-readable reason (errors, shutdown cause, summaries).
    pub reason: Option<Arc<str>>,
    /// Bound socket address (listener events).
    pub addr: Option<SocketAddr>,
    /// Drain deadline or grace period in milliseconds (compact).
    pub deadline_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            unit: None,
            reason: None,
            addr: None,
            deadline_ms: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a unit name.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches a bound socket address.
    #[inline]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_deadline(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.deadline_ms = Some(ms);
        self
    }

    /// Unit name or `"-"` when absent; convenience for log lines.
    pub fn unit_or_dash(&self) -> &str {
        self.unit.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::ServiceStarting);
        let b = Event::new(EventKind::ServiceStopping);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_deadline_saturates() {
        let ev = Event::new(EventKind::DrainStarted).with_deadline(Duration::from_secs(u64::MAX));
        assert_eq!(ev.deadline_ms, Some(u32::MAX));
    }
}
