//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] holds the timing and capacity settings of a supervisor run.
//!
//! ## Sentinel values
//! - `grace = 0s` → unbounded (wait for every unit however long it takes)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use super::shutdown::RepeatPolicy;

/// Settings for one supervisor run.
///
/// ## Field semantics
/// - `grace`: how long units may take to finish after cancellation fires (`0s` = unbounded)
/// - `drain_deadline`: bound on the HTTP listener's graceful drain
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `repeat_signal`: what [`Supervisor::run`](crate::Supervisor::run) does on a second OS signal
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time, measured from cancellation, for all units to finish.
    ///
    /// Units still running after it are aborted and recorded as
    /// [`UnitError::GraceExceeded`](crate::UnitError::GraceExceeded).
    pub grace: Duration,

    /// Maximum time for in-flight HTTP requests to finish once draining starts.
    pub drain_deadline: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Behavior on a repeated OS signal during shutdown.
    pub repeat_signal: RepeatPolicy,
}

impl SupervisorConfig {
    /// Returns the grace period as an `Option` (`None` = unbounded).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `drain_deadline = 10s`
    /// - `bus_capacity = 1024`
    /// - `repeat_signal = RepeatPolicy::Ignore`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            drain_deadline: Duration::from_secs(10),
            bus_capacity: 1024,
            repeat_signal: RepeatPolicy::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_grace_is_unbounded() {
        let cfg = SupervisorConfig {
            grace: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(cfg.grace_limit(), None);
        assert_eq!(
            SupervisorConfig::default().grace_limit(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = SupervisorConfig {
            bus_capacity: 0,
            ..Default::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
