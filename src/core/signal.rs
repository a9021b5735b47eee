//! # One-shot cancellation broadcast.
//!
//! [`CancellationSignal`] is the single coordination primitive of the supervisor:
//! external interrupts and unit failures both fire it, and every unit's shutdown
//! path is "observe it, then stop".
//!
//! ```text
//! SignalSource ──┐
//! unit failure ──┼──► fire(cause) ──► root CancellationToken ──► child tokens (units)
//! shutdown()   ──┘        │
//!                         └──► cause recorded once (first firer wins)
//! ```
//!
//! ## Rules
//! - Monotonic: once fired it is never unset.
//! - The first [`ShutdownCause`] is kept; later `fire` calls return `false`.
//! - Observers never miss the wakeup: the state is a condition, not an event.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::error::UnitError;

/// OS signals honored by the [`SignalSource`](crate::SignalSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsSignal {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
}

impl fmt::Display for OsSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsSignal::Interrupt => f.write_str("SIGINT"),
            OsSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Why the cancellation signal fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// An OS interrupt/terminate signal was received.
    Signal(OsSignal),
    /// A unit failed (fail-fast).
    UnitFailed {
        /// Name of the failing unit.
        unit: String,
    },
    /// Shutdown was requested programmatically.
    Requested,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Signal(sig) => write!(f, "received {sig}"),
            ShutdownCause::UnitFailed { unit } => write!(f, "unit {unit:?} failed"),
            ShutdownCause::Requested => f.write_str("shutdown requested"),
        }
    }
}

/// Shared, one-shot, monotonic broadcast condition.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<ShutdownCause>>,
}

impl CancellationSignal {
    /// Creates an unfired signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal.
    ///
    /// Returns `true` if this call fired it, `false` if it had already fired
    /// (the original cause is kept).
    pub fn fire(&self, cause: ShutdownCause) -> bool {
        let first = self.cause.set(cause).is_ok();
        self.token.cancel();
        first
    }

    /// Fires with [`ShutdownCause::UnitFailed`] if `err` is fatal for peers.
    ///
    /// Returns `true` if this call fired the signal.
    pub(crate) fn escalate(&self, unit: &str, err: &UnitError) -> bool {
        if !err.is_fatal() {
            return false;
        }
        self.fire(ShutdownCause::UnitFailed {
            unit: unit.to_owned(),
        })
    }

    /// True once fired.
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal has fired (immediately if it already has).
    pub async fn fired(&self) {
        self.token.cancelled().await
    }

    /// The cause recorded by the first `fire`, if any.
    pub fn cause(&self) -> Option<&ShutdownCause> {
        self.cause.get()
    }

    /// Returns a child token that is cancelled when the signal fires.
    ///
    /// Cancelling the child does not fire the signal.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
