//! # Supervisor: launches services and the listener, coordinates shutdown, collects outcomes.
//!
//! The [`Supervisor`] owns the event bus, the shared [`CancellationSignal`] and the
//! set of supervised units. Every unit is driven by two tasks in one [`TaskGroup`]:
//! a run task (`start` / `serve`) and a stop task (`stop` / `drain`).
//!
//! ## High-level architecture
//! ```text
//! Setup (single caller, before launch):
//!   register(svc) ... register(svc)      (ConfigError after launch / on duplicate name)
//!
//! launch():
//!   Bus.subscribe() ─► forwarder ─► SubscriberSet::emit(&Event)
//!   for each service i:
//!       group.spawn((i, Run),  run_start(svc, signal.child_token(), begun))
//!       group.spawn((i, Stop), run_stop(svc, begun))   waits for signal.fired()
//!   listener (index n):
//!       serve = group.spawn((n, Run),  listener.serve(ctx, served))
//!       group.spawn((n, Stop), drain(served, serve.abort_handle, drain_deadline))
//!
//! wait():
//!   loop over group.join_next():
//!       Finished(res) ─► slots.record(key, res)
//!       Panicked      ─► publish UnitPanicked ─► fire(UnitFailed) ─► record Panicked
//!       Aborted       ─► record Ok unless the slot is already filled
//!   signal fired    ─► publish ShutdownRequested ─► arm grace deadline
//!   grace elapsed   ─► record GraceExceeded for pending units ─► abort them
//!   group empty     ─► OutcomeSet ─► publish ShutdownComplete ─► flush subscribers
//! ```
//!
//! ## Rules
//! - Any fatal unit failure fires the signal; every peer then stops (fail-fast).
//! - Each service's `stop` is invoked at most once, and never before its `start` was invoked.
//! - `wait` returns only after the signal fired and every unit reported (or was aborted).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use servicevisor::{ServiceError, ServiceFn, StubService, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(SupervisorConfig::default());
//!
//!     sup.register(Arc::new(StubService::new("store")))?;
//!     sup.register(ServiceFn::arc(
//!         "worker",
//!         |ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Ok::<_, ServiceError>(())
//!         },
//!         || async { Ok::<_, ServiceError>(()) },
//!     ))?;
//!
//!     sup.launch()?;
//!     sup.shutdown();
//!
//!     let outcomes = sup.wait().await?;
//!     assert!(outcomes.aggregate().is_success());
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::{
    runtime::Handle,
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ConfigError, Phase, UnitError},
    events::{Bus, Event, EventKind},
    listener::{self, HttpListener},
    services::ServiceRef,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{
    builder::SupervisorBuilder,
    config::SupervisorConfig,
    group::{Joined, TaskGroup},
    outcome::{OutcomeSet, OutcomeSlots, UnitKind},
    runner::{UnitKey, run_start, run_stop},
    shutdown::SignalSource,
    signal::{CancellationSignal, ShutdownCause},
};

/// Coordinates service lifecycles, the HTTP listener, event delivery and shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    signal: CancellationSignal,
    state: Mutex<State>,
}

enum State {
    Pending {
        services: Vec<ServiceRef>,
        listener: Option<HttpListener>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    },
    Launched(Box<Running>),
    Collected,
}

struct Running {
    group: TaskGroup<UnitKey>,
    slots: OutcomeSlots,
    forwarder: JoinHandle<()>,
}

impl Supervisor {
    /// Creates a supervisor without subscribers or listener.
    pub fn new(cfg: SupervisorConfig) -> Self {
        SupervisorBuilder::new(cfg).build()
    }

    /// Starts a [`SupervisorBuilder`].
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        signal: CancellationSignal,
        subscribers: Vec<Arc<dyn Subscribe>>,
        listener: Option<HttpListener>,
    ) -> Self {
        Self {
            cfg,
            bus,
            signal,
            state: Mutex::new(State::Pending {
                services: Vec::new(),
                listener,
                subscribers,
            }),
        }
    }

    /// The configuration this supervisor runs with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Handle to the shared cancellation signal.
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    /// Adds a service to the pending set.
    ///
    /// # Errors
    /// - [`ConfigError::RegisterAfterLaunch`] once [`launch`](Self::launch) was called
    /// - [`ConfigError::DuplicateName`] if a unit with the same name exists
    pub fn register(&self, service: ServiceRef) -> Result<(), ConfigError> {
        let mut state = self.lock_state();
        let State::Pending {
            services, listener, ..
        } = &mut *state
        else {
            return Err(ConfigError::RegisterAfterLaunch {
                service: service.name().to_owned(),
            });
        };

        let name = service.name();
        let taken = services.iter().any(|s| s.name() == name)
            || listener.as_ref().is_some_and(|l| l.name() == name);
        if taken {
            return Err(ConfigError::DuplicateName {
                name: name.to_owned(),
            });
        }
        services.push(service);
        Ok(())
    }

    /// Starts every registered unit concurrently and returns immediately.
    ///
    /// # Errors
    /// - [`ConfigError::NoRuntime`] outside of a Tokio runtime
    /// - [`ConfigError::AlreadyLaunched`] on a second call
    pub fn launch(&self) -> Result<(), ConfigError> {
        if Handle::try_current().is_err() {
            return Err(ConfigError::NoRuntime);
        }

        let mut state = self.lock_state();
        let (services, listener, subscribers) = match std::mem::replace(&mut *state, State::Collected) {
            State::Pending {
                services,
                listener,
                subscribers,
            } => (services, listener, subscribers),
            other => {
                *state = other;
                return Err(ConfigError::AlreadyLaunched);
            }
        };

        let forwarder = tokio::spawn(forward_events(
            self.bus.subscribe(),
            SubscriberSet::new(subscribers),
        ));

        let mut group = TaskGroup::new();
        let mut slots = OutcomeSlots::default();

        for service in services {
            let index = slots.push(service.name(), UnitKind::Service);
            let begun = CancellationToken::new();
            group.spawn(
                UnitKey::run(index),
                run_start(
                    service.clone(),
                    self.signal.child_token(),
                    begun.clone(),
                    self.signal.clone(),
                    self.bus.clone(),
                ),
            );
            group.spawn(
                UnitKey::stop(index),
                run_stop(service, begun, self.signal.clone(), self.bus.clone()),
            );
        }

        if let Some(listener) = listener {
            let name = listener.name().to_owned();
            let index = slots.push(name.as_str(), UnitKind::Listener);
            let served = CancellationToken::new();
            let serve = group.spawn(
                UnitKey::run(index),
                listener.serve(
                    self.signal.child_token(),
                    served.clone(),
                    self.signal.clone(),
                    self.bus.clone(),
                ),
            );
            group.spawn(
                UnitKey::stop(index),
                listener::drain(
                    name,
                    served,
                    serve,
                    self.cfg.drain_deadline,
                    self.signal.clone(),
                    self.bus.clone(),
                ),
            );
        }

        tracing::debug!(tasks = group.len(), "supervisor launched");
        *state = State::Launched(Box::new(Running {
            group,
            slots,
            forwarder,
        }));
        Ok(())
    }

    /// Fires the cancellation signal with [`ShutdownCause::Requested`].
    ///
    /// Returns `false` if the signal had already fired.
    pub fn shutdown(&self) -> bool {
        self.signal.fire(ShutdownCause::Requested)
    }

    /// Blocks until the signal has fired and every unit has reported, then returns the outcomes.
    ///
    /// Units still running [`SupervisorConfig::grace`] after cancellation are aborted and
    /// recorded as [`UnitError::GraceExceeded`]. Subscribers are flushed before returning.
    ///
    /// # Errors
    /// - [`ConfigError::NotLaunched`] before [`launch`](Self::launch)
    /// - [`ConfigError::AlreadyWaited`] on a second call
    pub async fn wait(&self) -> Result<OutcomeSet, ConfigError> {
        let mut running = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, State::Collected) {
                State::Launched(running) => running,
                pending @ State::Pending { .. } => {
                    *state = pending;
                    return Err(ConfigError::NotLaunched);
                }
                State::Collected => return Err(ConfigError::AlreadyWaited),
            }
        };

        let grace = self.cfg.grace_limit();
        let mut announced = false;
        let mut deadline: Option<Instant> = None;

        while !running.group.is_empty() || !announced {
            tokio::select! {
                Some((key, joined)) = running.group.join_next(), if !running.group.is_empty() => {
                    running.record(key, joined, &self.signal, &self.bus);
                }
                _ = self.signal.fired(), if !announced => {
                    announced = true;
                    let cause = self
                        .signal
                        .cause()
                        .map_or_else(|| "unknown".to_owned(), ToString::to_string);
                    self.bus
                        .publish(Event::new(EventKind::ShutdownRequested).with_reason(cause));
                    deadline = grace.map(|g| Instant::now() + g);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    if let Some(grace) = grace {
                        running.expire(grace, &self.bus);
                    }
                }
                else => break,
            }
        }

        let Running {
            slots, forwarder, ..
        } = *running;
        let outcomes = slots.finish(self.signal.cause().cloned());
        let aggregate = outcomes.aggregate();
        self.bus
            .publish(Event::new(EventKind::ShutdownComplete).with_reason(aggregate.to_string()));
        join_forwarder(forwarder).await;

        Ok(outcomes)
    }

    /// Installs OS signal handling, launches, and waits.
    ///
    /// The first SIGINT/SIGTERM fires the signal; a repeated one follows
    /// [`SupervisorConfig::repeat_signal`].
    ///
    /// # Errors
    /// - [`ConfigError::SignalHandler`] if handlers cannot be registered
    /// - any error of [`launch`](Self::launch) or [`wait`](Self::wait)
    pub async fn run(&self) -> Result<OutcomeSet, ConfigError> {
        let source = SignalSource::install(self.cfg.repeat_signal).map_err(|e| {
            ConfigError::SignalHandler {
                error: e.to_string(),
            }
        })?;
        self.launch()?;

        let signals = source.spawn(self.signal.clone());
        let res = self.wait().await;
        signals.abort();
        res
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Running {
    fn record(&mut self, key: UnitKey, joined: Joined, signal: &CancellationSignal, bus: &Bus) {
        let result = match joined {
            Joined::Finished(res) => res,
            // aborted by the drain deadline or the grace period; the aborter already accounted for it
            Joined::Aborted => Ok(()),
            Joined::Panicked => {
                let unit = self.slots.name(key.index).to_owned();
                bus.publish(
                    Event::new(EventKind::UnitPanicked)
                        .with_unit(unit.as_str())
                        .with_reason(key.phase.to_string()),
                );
                let err = UnitError::Panicked {
                    unit: unit.clone(),
                    phase: key.phase,
                };
                signal.escalate(&unit, &err);
                Err(err)
            }
        };
        self.slots.record(key.index, key.phase, result);
    }

    fn expire(&mut self, grace: Duration, bus: &Bus) {
        let mut pending = self.group.pending();
        pending.sort_by_key(|k| (k.index, k.phase == Phase::Stop));

        for key in pending {
            let unit = self.slots.name(key.index).to_owned();
            bus.publish(
                Event::new(EventKind::GraceExceeded)
                    .with_unit(unit.as_str())
                    .with_deadline(grace),
            );
            self.slots.record(
                key.index,
                key.phase,
                Err(UnitError::GraceExceeded {
                    unit,
                    phase: key.phase,
                    grace,
                }),
            );
        }
        self.group.abort_all();
    }
}

/// Forwards bus events to subscribers until `ShutdownComplete`, then flushes them.
async fn forward_events(mut rx: broadcast::Receiver<Event>, set: SubscriberSet) {
    loop {
        match rx.recv().await {
            Ok(ev) => {
                let last = ev.kind == EventKind::ShutdownComplete;
                set.emit(&ev);
                if last {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event forwarder lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    set.shutdown().await;
}

/// Awaits the forwarder; returns `false` if it panicked or was cancelled.
async fn join_forwarder(forwarder: JoinHandle<()>) -> bool {
    match forwarder.await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                error = %err,
                panicked = err.is_panic(),
                "event forwarder ended abnormally, subscribers may have missed events"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_forwarder_absorbs_panic() {
        let done = tokio::spawn(async {});
        assert!(join_forwarder(done).await);

        let panicked = tokio::spawn(async { panic!("forwarder blew up") });
        assert!(!join_forwarder(panicked).await);
    }

    #[tokio::test]
    async fn test_forwarder_stops_after_shutdown_complete() {
        let bus = Bus::new(8);
        let forwarder = tokio::spawn(forward_events(bus.subscribe(), SubscriberSet::new(Vec::new())));

        bus.publish(Event::new(EventKind::ShutdownRequested));
        bus.publish(Event::new(EventKind::ShutdownComplete));

        let joined = tokio::time::timeout(std::time::Duration::from_secs(1), join_forwarder(forwarder))
            .await
            .expect("forwarder must stop on ShutdownComplete");
        assert!(joined);
    }
}
