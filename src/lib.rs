//! # servicevisor
//!
//! **Servicevisor** is a lifecycle supervisor for a process that hosts several
//! long-running services and one HTTP endpoint.
//!
//! It starts every service concurrently, serves HTTP next to them, and stops
//! everything in a coordinated way when the process is interrupted or any unit
//! fails. Each service is stopped at most once, in-flight HTTP requests are
//! drained under a deadline, and every unit's result is collected into a single
//! [`OutcomeSet`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Service    │   │   Service    │   │   Service    │   │ HttpListener │
//!     │   (store)    │   │  (consumer)  │   │    (any)     │   │  (/health)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼                  ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                              │
//! │  - CancellationSignal (one-shot, first cause wins)                       │
//! │  - TaskGroup: run task + stop task per unit                              │
//! │  - Bus (broadcast events) ─► SubscriberSet (per-subscriber queues)       │
//! └──────┬──────────────────┬──────────────────┬──────────────────┬──────────┘
//!        ▼                  ▼                  ▼                  ▼
//!   start(ctx)         start(ctx)         start(ctx)        serve(ctx)
//!   stop() once        stop() once        stop() once       drain(deadline)
//!        │                  │                  │                  │
//!        └──────────────────┴─────────┬────────┴──────────────────┘
//!                                     ▼
//!                        OutcomeSet ─► Aggregate ─► exit code
//! ```
//!
//! ### Lifecycle
//! ```text
//! register(..)* ──► launch() ──► wait()
//!
//! cancellation fires on the first of:
//!   - SIGINT / SIGTERM           (SignalSource, via Supervisor::run)
//!   - a unit fails to start/bind (fail-fast)
//!   - Supervisor::shutdown()
//!
//! then, concurrently for every unit:
//!   service  ─► stop()                      (at most once, after start was invoked)
//!   listener ─► stop accepting, drain ≤ drain_deadline, else force-close
//!
//! units still running after `grace` ─► aborted, recorded as GraceExceeded
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                        |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------|
//! | **Services**      | Units with independent start/stop behaviors.                  | [`Service`], [`ServiceFn`], [`StubService`] |
//! | **HTTP**          | Supervised endpoint with bounded graceful drain.              | [`HttpListener`]                          |
//! | **Supervision**   | Launch, fail-fast cancellation, outcome collection.           | [`Supervisor`], [`CancellationSignal`]    |
//! | **Signals**       | SIGINT/SIGTERM wired to the cancellation signal.              | [`SignalSource`], [`RepeatPolicy`]        |
//! | **Outcomes**      | Per-unit results and their aggregation.                       | [`OutcomeSet`], [`Aggregate`]             |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).        | [`Subscribe`], [`LogWriter`]              |
//! | **Errors**        | Typed errors for services, units and setup misuse.            | [`ServiceError`], [`UnitError`], [`ConfigError`] |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use servicevisor::{LogWriter, StubService, Subscribe, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         grace: Duration::from_secs(5),
//!         ..SupervisorConfig::default()
//!     };
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
//!     sup.register(Arc::new(StubService::new("store")))?;
//!     sup.register(Arc::new(StubService::new("consumer")))?;
//!
//!     sup.launch()?;
//!     // normally an OS signal or a failing unit does this
//!     sup.shutdown();
//!
//!     let outcomes = sup.wait().await?;
//!     assert_eq!(outcomes.exit_code(), 0);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod listener;
mod services;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Aggregate, CancellationSignal, FORCE_EXIT_CODE, OsSignal, OutcomeSet, RepeatPolicy,
    ShutdownCause, SignalSource, Supervisor, SupervisorBuilder, SupervisorConfig, UnitKind,
    UnitOutcome,
};
pub use error::{ConfigError, Phase, ServiceError, UnitError};
pub use events::{Event, EventKind};
pub use listener::{DEFAULT_LISTENER_NAME, HttpListener};
pub use services::{Service, ServiceFn, ServiceRef, StubService};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
