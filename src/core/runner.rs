//! # Start and stop runners for one service.
//!
//! Each registered service is driven by two independent tasks: one runs `start`,
//! the other waits for cancellation and then runs `stop`. Both publish lifecycle
//! events to the [`Bus`] and return the unit's result for that phase.
//!
//! ## Event flow
//!
//! ```text
//! start task:
//!   publish ServiceStarting → begun.cancel() → service.start(ctx)
//!     Ok / Err(Canceled) → publish ServiceExited → Ok
//!     Err(e)             → publish ServiceFailed → fire UnitFailed → Err(StartFailure)
//!
//! stop task:
//!   shutdown.fired() → begun.cancelled() → publish ServiceStopping → service.stop()
//!     Ok     → publish ServiceStopped → Ok
//!     Err(e) → publish StopFailed     → Err(StopFailure)   (does not fire again)
//! ```
//!
//! ## Rules
//! - `stop` is invoked at most once per service by the supervisor.
//! - `stop` never runs before `start` was invoked (the `begun` token).
//! - `stop` does not wait for `start` to return.
//! - `Canceled` from `start` is a graceful exit, not a failure.

use tokio_util::sync::CancellationToken;

use crate::{
    error::{Phase, ServiceError, UnitError},
    events::{Bus, Event, EventKind},
    services::ServiceRef,
};

use super::signal::CancellationSignal;

/// Identifies one grouped task: which unit, which half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct UnitKey {
    pub(crate) index: usize,
    pub(crate) phase: Phase,
}

impl UnitKey {
    pub(crate) fn run(index: usize) -> Self {
        Self {
            index,
            phase: Phase::Run,
        }
    }

    pub(crate) fn stop(index: usize) -> Self {
        Self {
            index,
            phase: Phase::Stop,
        }
    }
}

/// Runs `service.start` with the unit's cancellation token.
pub(crate) async fn run_start(
    service: ServiceRef,
    ctx: CancellationToken,
    begun: CancellationToken,
    shutdown: CancellationSignal,
    bus: Bus,
) -> Result<(), UnitError> {
    let name = service.name().to_owned();
    bus.publish(Event::new(EventKind::ServiceStarting).with_unit(name.as_str()));
    begun.cancel();

    match service.start(ctx).await {
        Ok(()) | Err(ServiceError::Canceled) => {
            bus.publish(Event::new(EventKind::ServiceExited).with_unit(name.as_str()));
            Ok(())
        }
        Err(err) => {
            bus.publish(
                Event::new(EventKind::ServiceFailed)
                    .with_unit(name.as_str())
                    .with_reason(err.to_string()),
            );
            let err = UnitError::StartFailure {
                service: name,
                source: err,
            };
            shutdown.escalate(service.name(), &err);
            Err(err)
        }
    }
}

/// Waits for cancellation (and for `start` to have been invoked), then runs `service.stop`.
pub(crate) async fn run_stop(
    service: ServiceRef,
    begun: CancellationToken,
    shutdown: CancellationSignal,
    bus: Bus,
) -> Result<(), UnitError> {
    shutdown.fired().await;
    begun.cancelled().await;

    let name = service.name().to_owned();
    bus.publish(Event::new(EventKind::ServiceStopping).with_unit(name.as_str()));

    match service.stop().await {
        Ok(()) => {
            bus.publish(Event::new(EventKind::ServiceStopped).with_unit(name.as_str()));
            Ok(())
        }
        Err(err) => {
            bus.publish(
                Event::new(EventKind::StopFailed)
                    .with_unit(name.as_str())
                    .with_reason(err.to_string()),
            );
            let err = UnitError::StopFailure {
                service: name,
                source: err,
            };
            shutdown.escalate(service.name(), &err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShutdownCause;
    use crate::services::{ServiceFn, StubService};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_start_failure_fires_signal() {
        let shutdown = CancellationSignal::new();
        let svc: ServiceRef = Arc::new(StubService::failing(
            "consumer",
            ServiceError::connection("refused"),
        ));

        let res = run_start(
            svc,
            shutdown.child_token(),
            CancellationToken::new(),
            shutdown.clone(),
            Bus::new(8),
        )
        .await;

        assert!(matches!(res, Err(UnitError::StartFailure { ref service, .. }) if service == "consumer"));
        assert_eq!(
            shutdown.cause(),
            Some(&ShutdownCause::UnitFailed {
                unit: "consumer".into()
            })
        );
    }

    #[tokio::test]
    async fn test_canceled_start_is_graceful() {
        let shutdown = CancellationSignal::new();
        let svc: ServiceRef = ServiceFn::arc(
            "worker",
            |ctx: CancellationToken| async move {
                ctx.cancelled().await;
                Err::<(), _>(ServiceError::Canceled)
            },
            || async { Ok::<_, ServiceError>(()) },
        );

        shutdown.fire(ShutdownCause::Requested);
        let res = run_start(
            svc,
            shutdown.child_token(),
            CancellationToken::new(),
            shutdown.clone(),
            Bus::new(8),
        )
        .await;
        assert_eq!(res, Ok(()));
    }

    #[tokio::test]
    async fn test_stop_waits_for_signal_and_begun() {
        let shutdown = CancellationSignal::new();
        let begun = CancellationToken::new();
        let stub = Arc::new(StubService::new("store"));

        let handle = tokio::spawn(run_stop(
            stub.clone(),
            begun.clone(),
            shutdown.clone(),
            Bus::new(8),
        ));

        shutdown.fire(ShutdownCause::Requested);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stub.stop_calls(), 0, "stop must not run before start was invoked");

        begun.cancel();
        let res = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("stop must complete")
            .unwrap();
        assert_eq!(res, Ok(()));
        assert_eq!(stub.stop_calls(), 1);
    }

    #[tokio::test]
    async fn test_stop_failure_is_recorded_without_refiring() {
        let shutdown = CancellationSignal::new();
        let begun = CancellationToken::new();
        begun.cancel();
        let svc: ServiceRef = ServiceFn::arc(
            "store",
            |_ctx: CancellationToken| async { Ok::<_, ServiceError>(()) },
            || async { Err::<(), _>(ServiceError::fail("flush failed")) },
        );

        shutdown.fire(ShutdownCause::Signal(crate::OsSignal::Interrupt));
        let res = run_stop(svc, begun, shutdown.clone(), Bus::new(8)).await;

        assert!(matches!(res, Err(UnitError::StopFailure { .. })));
        assert_eq!(
            shutdown.cause(),
            Some(&ShutdownCause::Signal(crate::OsSignal::Interrupt))
        );
    }
}
