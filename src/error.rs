//! Error types used by the supervisor runtime and by services.
//!
//! This module defines three error enums:
//!
//! - [`ServiceError`]: errors returned by individual services from `start`/`stop`.
//! - [`UnitError`]: terminal failures recorded per unit in the [`OutcomeSet`](crate::OutcomeSet).
//! - [`ConfigError`]: misuse of the supervisor at setup time (never reaches the concurrent phase).
//!
//! All types provide `as_label` for logs; [`UnitError`] and [`ConfigError`] also
//! map to a process exit code.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by service start/stop behaviors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The external connection/resource the service represents could not be established or was lost.
    #[error("connection error: {error}")]
    Connection {
        /// The underlying error message.
        error: String,
    },

    /// Any other failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The service observed cancellation and exited; treated as a graceful exit.
    #[error("context cancelled")]
    Canceled,
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Connection`].
    pub fn connection(error: impl Into<String>) -> Self {
        ServiceError::Connection {
            error: error.into(),
        }
    }

    /// Shorthand for [`ServiceError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        ServiceError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servicevisor::ServiceError;
    ///
    /// assert_eq!(ServiceError::connection("refused").as_label(), "service_connection");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Connection { .. } => "service_connection",
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Canceled => "service_canceled",
        }
    }
}

/// Which half of a unit's lifecycle produced an outcome.
///
/// For services this is `start`/`stop`; for the listener it is `serve`/`drain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Service `start` or listener `serve`.
    Run,
    /// Service `stop` or listener `drain`.
    Stop,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Run => f.write_str("run"),
            Phase::Stop => f.write_str("stop"),
        }
    }
}

/// # Terminal failure of one supervised unit.
///
/// These are recorded in the [`OutcomeSet`](crate::OutcomeSet) and decide the process exit code.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// A service's start behavior returned an error. Fatal: triggers cancellation of all peers.
    #[error("service {service:?} failed to start: {source}")]
    StartFailure {
        /// Service name.
        service: String,
        /// Error returned by the service.
        source: ServiceError,
    },

    /// A service's stop behavior returned an error. Recorded; peers still stop.
    #[error("service {service:?} failed to stop: {source}")]
    StopFailure {
        /// Service name.
        service: String,
        /// Error returned by the service.
        source: ServiceError,
    },

    /// The HTTP endpoint could not bind. Fatal, same as [`UnitError::StartFailure`].
    #[error("listener failed to bind {addr}: {error}")]
    ListenerBind {
        /// Configured bind address.
        addr: String,
        /// The underlying I/O error message.
        error: String,
    },

    /// The HTTP endpoint stopped serving for a reason other than a requested shutdown.
    #[error("listener on {addr} failed: {error}")]
    ListenerServe {
        /// Configured bind address.
        addr: String,
        /// The underlying I/O error message.
        error: String,
    },

    /// Graceful drain exceeded its deadline and the listener was force-closed.
    #[error("listener drain exceeded {deadline:?}; connections force-closed")]
    DrainTimeout {
        /// The configured drain deadline.
        deadline: Duration,
    },

    /// The unit did not finish within the shutdown grace period and was aborted.
    #[error("unit {unit:?} ({phase}) did not finish within {grace:?}; aborted")]
    GraceExceeded {
        /// Unit name.
        unit: String,
        /// Phase that was still running.
        phase: Phase,
        /// The configured grace duration.
        grace: Duration,
    },

    /// The unit panicked; the panic was contained to its task.
    #[error("unit {unit:?} panicked during {phase}")]
    Panicked {
        /// Unit name.
        unit: String,
        /// Phase that panicked.
        phase: Phase,
    },

    /// The unit never reported an outcome.
    #[error("unit {unit:?} ({phase}) never reported an outcome")]
    Unjoined {
        /// Unit name.
        unit: String,
        /// Phase without an outcome.
        phase: Phase,
    },
}

impl UnitError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servicevisor::UnitError;
    /// use std::time::Duration;
    ///
    /// let err = UnitError::DrainTimeout { deadline: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "drain_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitError::StartFailure { .. } => "start_failure",
            UnitError::StopFailure { .. } => "stop_failure",
            UnitError::ListenerBind { .. } => "listener_bind_failure",
            UnitError::ListenerServe { .. } => "listener_serve_failure",
            UnitError::DrainTimeout { .. } => "drain_timeout",
            UnitError::GraceExceeded { .. } => "grace_exceeded",
            UnitError::Panicked { .. } => "unit_panicked",
            UnitError::Unjoined { .. } => "unit_unjoined",
        }
    }

    /// Process exit code reported to the operator when this error decides the aggregate.
    pub fn exit_code(&self) -> u8 {
        match self {
            UnitError::StartFailure { .. } => 3,
            UnitError::ListenerBind { .. } | UnitError::ListenerServe { .. } => 4,
            UnitError::StopFailure { .. } => 5,
            UnitError::DrainTimeout { .. } => 6,
            UnitError::GraceExceeded { .. } => 7,
            UnitError::Panicked { .. } | UnitError::Unjoined { .. } => 8,
        }
    }

    /// Whether this failure must cancel every peer (fail-fast).
    ///
    /// Stop-side failures happen after cancellation already fired, so only
    /// run-side failures qualify.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            UnitError::StartFailure { .. }
                | UnitError::ListenerBind { .. }
                | UnitError::ListenerServe { .. }
                | UnitError::Panicked { .. }
        )
    }
}

/// # Invalid supervisor usage.
///
/// Returned synchronously by setup calls; never recorded in an [`OutcomeSet`](crate::OutcomeSet).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `register` was called after `launch`.
    #[error("cannot register service {service:?}: supervisor already launched")]
    RegisterAfterLaunch {
        /// Name of the rejected service.
        service: String,
    },

    /// A unit with this name is already registered.
    #[error("duplicate unit name {name:?}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// `launch` was called twice.
    #[error("supervisor already launched")]
    AlreadyLaunched,

    /// `wait` was called before `launch`.
    #[error("supervisor not launched")]
    NotLaunched,

    /// `wait` was called twice.
    #[error("supervisor outcomes already collected")]
    AlreadyWaited,

    /// `launch` was called outside of a Tokio runtime.
    #[error("no tokio runtime available to launch units")]
    NoRuntime,

    /// OS signal handlers could not be registered.
    #[error("failed to install signal handlers: {error}")]
    SignalHandler {
        /// The underlying I/O error message.
        error: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::RegisterAfterLaunch { .. } => "config_register_after_launch",
            ConfigError::DuplicateName { .. } => "config_duplicate_name",
            ConfigError::AlreadyLaunched => "config_already_launched",
            ConfigError::NotLaunched => "config_not_launched",
            ConfigError::AlreadyWaited => "config_already_waited",
            ConfigError::NoRuntime => "config_no_runtime",
            ConfigError::SignalHandler { .. } => "config_signal_handler",
        }
    }

    /// Process exit code for setup-time failures.
    pub fn exit_code(&self) -> u8 {
        2
    }
}
