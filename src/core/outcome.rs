//! # Per-unit outcomes and their aggregation.
//!
//! Every supervised unit reports exactly one result for each half of its lifecycle
//! (run and stop). [`OutcomeSet`] collects them in registration order and reduces
//! them into a single [`Aggregate`] for the operator.
//!
//! ## Aggregation
//! - every result `Ok` → [`Aggregate::Success`]
//! - otherwise → [`Aggregate::Failure`] with the first error in registration order
//!   (a unit's run error is considered before its stop error)

use std::fmt;

use crate::error::{Phase, UnitError};

use super::signal::ShutdownCause;

/// What kind of unit an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A registered [`Service`](crate::Service).
    Service,
    /// The [`HttpListener`](crate::HttpListener).
    Listener,
}

/// Results of one unit.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    name: String,
    kind: UnitKind,
    run: Result<(), UnitError>,
    stop: Result<(), UnitError>,
}

impl UnitOutcome {
    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit kind.
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Result of `start` (service) or `serve` (listener).
    pub fn run(&self) -> &Result<(), UnitError> {
        &self.run
    }

    /// Result of `stop` (service) or `drain` (listener).
    pub fn stop(&self) -> &Result<(), UnitError> {
        &self.stop
    }

    /// First error of this unit, run side first.
    pub fn error(&self) -> Option<&UnitError> {
        self.run.as_ref().err().or(self.stop.as_ref().err())
    }

    /// True if both halves succeeded.
    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

/// Overall result of a supervisor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// Every unit succeeded.
    Success,
    /// At least one unit failed; carries the first failure.
    Failure {
        /// Unit that produced the error.
        unit: String,
        /// The error.
        error: UnitError,
    },
}

impl Aggregate {
    /// True for [`Aggregate::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Aggregate::Success)
    }

    /// Process exit code: `0` on success, otherwise [`UnitError::exit_code`].
    pub fn exit_code(&self) -> u8 {
        match self {
            Aggregate::Success => 0,
            Aggregate::Failure { error, .. } => error.exit_code(),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Success => f.write_str("success"),
            Aggregate::Failure { unit, error } => write!(f, "failure in {unit:?}: {error}"),
        }
    }
}

/// Complete record of a supervisor run, in registration order.
#[derive(Debug, Clone)]
pub struct OutcomeSet {
    units: Vec<UnitOutcome>,
    cause: Option<ShutdownCause>,
}

impl OutcomeSet {
    /// Outcome of the unit called `name`.
    pub fn get(&self, name: &str) -> Option<&UnitOutcome> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Iterates outcomes in registration order (services first, listener last).
    pub fn iter(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.units.iter()
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True when no unit was supervised.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// What fired the cancellation signal.
    pub fn cause(&self) -> Option<&ShutdownCause> {
        self.cause.as_ref()
    }

    /// Reduces all outcomes into one.
    pub fn aggregate(&self) -> Aggregate {
        self.units
            .iter()
            .find_map(|u| {
                u.error().map(|error| Aggregate::Failure {
                    unit: u.name.clone(),
                    error: error.clone(),
                })
            })
            .unwrap_or(Aggregate::Success)
    }

    /// Shorthand for `aggregate().exit_code()`.
    pub fn exit_code(&self) -> u8 {
        self.aggregate().exit_code()
    }
}

/// Write-once result slots filled while units finish.
#[derive(Debug, Default)]
pub(crate) struct OutcomeSlots {
    slots: Vec<Slot>,
}

#[derive(Debug)]
struct Slot {
    name: String,
    kind: UnitKind,
    run: Option<Result<(), UnitError>>,
    stop: Option<Result<(), UnitError>>,
}

impl OutcomeSlots {
    /// Appends a unit and returns its index.
    pub(crate) fn push(&mut self, name: impl Into<String>, kind: UnitKind) -> usize {
        self.slots.push(Slot {
            name: name.into(),
            kind,
            run: None,
            stop: None,
        });
        self.slots.len() - 1
    }

    pub(crate) fn name(&self, index: usize) -> &str {
        self.slots.get(index).map_or("-", |s| s.name.as_str())
    }

    /// Records a result. The first result for a slot wins; returns whether it was stored.
    pub(crate) fn record(&mut self, index: usize, phase: Phase, result: Result<(), UnitError>) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let cell = match phase {
            Phase::Run => &mut slot.run,
            Phase::Stop => &mut slot.stop,
        };
        if cell.is_some() {
            return false;
        }
        *cell = Some(result);
        true
    }

    /// Freezes the slots; empty ones become [`UnitError::Unjoined`].
    pub(crate) fn finish(self, cause: Option<ShutdownCause>) -> OutcomeSet {
        let units = self
            .slots
            .into_iter()
            .map(|slot| {
                let unjoined = |phase| UnitError::Unjoined {
                    unit: slot.name.clone(),
                    phase,
                };
                UnitOutcome {
                    run: slot.run.unwrap_or_else(|| Err(unjoined(Phase::Run))),
                    stop: slot.stop.unwrap_or_else(|| Err(unjoined(Phase::Stop))),
                    name: slot.name,
                    kind: slot.kind,
                }
            })
            .collect();
        OutcomeSet { units, cause }
    }
}
