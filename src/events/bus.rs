//! # Lifecycle event bus.
//!
//! [`Bus`] carries [`Event`]s from the unit tasks to the supervisor's single
//! forwarder, which hands them to the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ```text
//! run_start / run_stop ──┐
//! serve / drain        ──┼──► Bus ──► forwarder ──► SubscriberSet ──► subscribers
//! Supervisor::wait     ──┘
//! ```
//!
//! Publishing never blocks a unit: a slow forwarder sees `Lagged(n)` and loses the
//! `n` oldest events rather than stalling shutdown. Events published before
//! [`Supervisor::launch`](crate::Supervisor::launch) subscribes the forwarder are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publishing handle shared by every unit task.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring buffer holds `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev`; dropped silently when nobody is subscribed.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Opens a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_lagging_receiver_keeps_newest() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for kind in [
            EventKind::ServiceStarting,
            EventKind::ServiceStopping,
            EventKind::ShutdownComplete,
        ] {
            bus.publish(Event::new(kind));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ServiceStopping);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ShutdownComplete);
    }
}
