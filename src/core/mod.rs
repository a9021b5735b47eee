//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Supervisor`] and the types it hands out.
//!
//! Internal modules:
//! - [`supervisor`]: registers units, launches them, collects the outcome set;
//! - [`runner`]: the start and stop tasks of one service;
//! - [`group`]: keyed task group with panic containment;
//! - [`signal`]: the shared one-shot cancellation signal;
//! - [`shutdown`]: OS signal source (SIGINT/SIGTERM/Ctrl-C);
//! - [`outcome`]: per-unit results and aggregation;
//! - [`builder`], [`config`]: construction and settings.

mod builder;
mod config;
mod group;
mod outcome;
mod runner;
mod shutdown;
mod signal;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use outcome::{Aggregate, OutcomeSet, UnitKind, UnitOutcome};
pub use shutdown::{FORCE_EXIT_CODE, RepeatPolicy, SignalSource};
pub use signal::{CancellationSignal, OsSignal, ShutdownCause};
pub use supervisor::Supervisor;
