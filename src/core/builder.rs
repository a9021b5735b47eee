//! # Builder for [`Supervisor`].
//!
//! Collects the configuration, the event subscribers and the optional
//! [`HttpListener`] before any unit exists; services are registered on the
//! built supervisor.

use std::sync::Arc;

use crate::{
    events::Bus,
    listener::HttpListener,
    subscribers::Subscribe,
};

use super::{config::SupervisorConfig, signal::CancellationSignal, supervisor::Supervisor};

/// Builder for constructing a [`Supervisor`] with optional features.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    listener: Option<HttpListener>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            listener: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with bounded
    /// queues; they start with [`Supervisor::launch`] and are flushed by
    /// [`Supervisor::wait`].
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Supervises an HTTP endpoint next to the registered services.
    ///
    /// The listener is recorded after every service in the [`OutcomeSet`](crate::OutcomeSet).
    pub fn with_listener(mut self, listener: HttpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Builds the supervisor. Nothing is spawned until [`Supervisor::launch`].
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        Supervisor::new_internal(
            self.cfg,
            bus,
            CancellationSignal::new(),
            self.subscribers,
            self.listener,
        )
    }
}
