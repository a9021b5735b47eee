//! # OS signal source.
//!
//! Converts OS interrupt notifications into a single firing of the shared
//! [`CancellationSignal`].
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! ## Repeated signals
//! The shared signal fires at most once. What happens on a second OS signal while
//! shutdown is in progress is decided by [`RepeatPolicy`].

use std::io;

use futures::StreamExt;
use futures::stream::{BoxStream, Stream};
use tokio::task::JoinHandle;

use super::signal::{CancellationSignal, OsSignal, ShutdownCause};

/// Exit code used by [`RepeatPolicy::ForceExit`].
pub const FORCE_EXIT_CODE: i32 = 130;

/// Behavior on a repeated interrupt/terminate while shutdown is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatPolicy {
    /// Log and keep waiting for graceful shutdown.
    #[default]
    Ignore,
    /// Exit the process immediately with [`FORCE_EXIT_CODE`].
    ForceExit,
}

/// Registered OS signal handlers, ready to be forwarded into a [`CancellationSignal`].
pub struct SignalSource {
    signals: BoxStream<'static, OsSignal>,
    repeat: RepeatPolicy,
}

impl SignalSource {
    /// Registers the OS handlers.
    ///
    /// Registration happens here (not in [`spawn`](Self::spawn)) so that failures are
    /// reported before any unit is launched. Must be called from within a Tokio runtime.
    pub fn install(repeat: RepeatPolicy) -> io::Result<Self> {
        Ok(Self {
            signals: os_signals()?,
            repeat,
        })
    }

    /// Forwards the first received signal into `shutdown`.
    ///
    /// The returned task keeps consuming signals according to the [`RepeatPolicy`];
    /// abort it once shutdown is complete.
    pub fn spawn(self, shutdown: CancellationSignal) -> JoinHandle<()> {
        tokio::spawn(forward(self.signals, shutdown, self.repeat))
    }
}

/// Fires `shutdown` on the first item of `signals`, then applies `repeat` to the rest.
pub(crate) async fn forward<S>(mut signals: S, shutdown: CancellationSignal, repeat: RepeatPolicy)
where
    S: Stream<Item = OsSignal> + Unpin,
{
    let Some(first) = signals.next().await else {
        return;
    };
    if shutdown.fire(ShutdownCause::Signal(first)) {
        tracing::info!(signal = %first, "signal received, shutting down");
    } else {
        tracing::debug!(signal = %first, "signal received during shutdown");
    }

    while let Some(sig) = signals.next().await {
        match repeat {
            RepeatPolicy::Ignore => {
                tracing::warn!(signal = %sig, "shutdown already in progress, signal ignored");
            }
            RepeatPolicy::ForceExit => {
                tracing::warn!(signal = %sig, "repeated signal, forcing exit");
                std::process::exit(FORCE_EXIT_CODE);
            }
        }
    }
}

#[cfg(unix)]
fn os_signals() -> io::Result<BoxStream<'static, OsSignal>> {
    use tokio::signal::unix::{SignalKind, signal};

    let sigint = signal(SignalKind::interrupt())?;
    let sigterm = signal(SignalKind::terminate())?;

    let stream = futures::stream::unfold((sigint, sigterm), |(mut int, mut term)| async move {
        let sig = tokio::select! {
            Some(()) = int.recv() => OsSignal::Interrupt,
            Some(()) = term.recv() => OsSignal::Terminate,
            else => return None,
        };
        Some((sig, (int, term)))
    });
    Ok(stream.boxed())
}

#[cfg(not(unix))]
fn os_signals() -> io::Result<BoxStream<'static, OsSignal>> {
    let stream = futures::stream::unfold((), |()| async move {
        tokio::signal::ctrl_c().await.ok()?;
        Some((OsSignal::Interrupt, ()))
    });
    Ok(stream.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_signal_fires_once() {
        let shutdown = CancellationSignal::new();
        let signals = futures::stream::iter(vec![OsSignal::Terminate, OsSignal::Interrupt]);

        forward(signals, shutdown.clone(), RepeatPolicy::Ignore).await;

        assert!(shutdown.is_fired());
        assert_eq!(
            shutdown.cause(),
            Some(&ShutdownCause::Signal(OsSignal::Terminate))
        );
    }

    #[tokio::test]
    async fn test_signal_after_unit_failure_keeps_cause() {
        let shutdown = CancellationSignal::new();
        shutdown.fire(ShutdownCause::UnitFailed {
            unit: "consumer".into(),
        });

        forward(
            futures::stream::iter(vec![OsSignal::Interrupt]),
            shutdown.clone(),
            RepeatPolicy::Ignore,
        )
        .await;

        assert_eq!(
            shutdown.cause(),
            Some(&ShutdownCause::UnitFailed {
                unit: "consumer".into()
            })
        );
    }

    #[tokio::test]
    async fn test_empty_stream_never_fires() {
        let shutdown = CancellationSignal::new();
        forward(
            futures::stream::empty(),
            shutdown.clone(),
            RepeatPolicy::ForceExit,
        )
        .await;
        assert!(!shutdown.is_fired());
    }
}
