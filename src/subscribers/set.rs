//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] hands each lifecycle [`Event`] to every subscriber without
//! waiting for any of them, so a slow log sink can never delay a unit's shutdown.
//!
//! ```text
//!    emit(&Event) ──┬──► [queue S1] ─► worker S1 ─► on_event()
//!                   ├──► [queue S2] ─► worker S2 ─► on_event()
//!                   └──► [queue SN] ─► worker SN ─► on_event()
//!
//!    shutdown() ─► close queues ─► workers drain ─► report drops per subscriber
//! ```
//!
//! ## Guarantees
//! - `emit` returns immediately; order is FIFO per subscriber.
//! - A panicking subscriber is logged and keeps receiving later events.
//! - [`SubscriberSet::shutdown`] delivers everything already queued.
//!
//! Events that do not fit a full queue are dropped for that subscriber only and
//! counted; the totals are logged once at shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinSet};

use crate::events::Event;

use super::Subscribe;

struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
}

/// Fan-out with one bounded queue and one worker task per subscriber.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: JoinSet<()>,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber on the current Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut workers = JoinSet::new();

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            lanes.push(Lane {
                name: sub.name(),
                tx,
                dropped: AtomicU64::new(0),
            });
            workers.spawn(deliver(sub, rx));
        }

        Self { lanes, workers }
    }

    /// Queues `event` for every subscriber.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for lane in &self.lanes {
            let full = lane.tx.try_send(Arc::clone(&ev)).is_err();
            if full && lane.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                tracing::warn!(
                    subscriber = lane.name,
                    seq = ev.seq,
                    "subscriber queue full, dropping events"
                );
            }
        }
    }

    /// Closes every queue and waits until the workers delivered what was queued.
    pub async fn shutdown(self) {
        let Self { lanes, mut workers } = self;
        for lane in lanes {
            let dropped = lane.dropped.into_inner();
            if dropped > 0 {
                tracing::warn!(subscriber = lane.name, dropped, "subscriber missed events");
            }
        }
        while workers.join_next().await.is_some() {}
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

async fn deliver(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev)).catch_unwind();
        if let Err(panic) = handled.await {
            tracing::warn!(
                subscriber = sub.name(),
                seq = ev.seq,
                info = %panic_message(panic.as_ref()),
                "subscriber panicked"
            );
        }
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    struct Slow(Mutex<usize>);

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, _event: &Event) {
            tokio::time::sleep(Duration::from_millis(5)).await;
            *self.0.lock().unwrap() += 1;
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_queues_in_order() {
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>]);
        assert_eq!(set.len(), 1);

        set.emit(&Event::new(EventKind::ServiceStarting));
        set.emit(&Event::new(EventKind::ServiceStopped));
        set.shutdown().await;

        assert_eq!(
            *rec.0.lock().unwrap(),
            vec![EventKind::ServiceStarting, EventKind::ServiceStopped]
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_isolated() {
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let set = SubscriberSet::new(vec![
            Arc::new(Panicky) as Arc<dyn Subscribe>,
            rec.clone() as Arc<dyn Subscribe>,
        ]);

        set.emit(&Event::new(EventKind::ShutdownRequested));
        set.emit(&Event::new(EventKind::ShutdownComplete));
        set.shutdown().await;

        assert_eq!(rec.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_drops_only_for_that_subscriber() {
        let slow = Arc::new(Slow(Mutex::new(0)));
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let set = SubscriberSet::new(vec![
            slow.clone() as Arc<dyn Subscribe>,
            rec.clone() as Arc<dyn Subscribe>,
        ]);

        for _ in 0..10 {
            set.emit(&Event::new(EventKind::ServiceStarting));
        }
        set.shutdown().await;

        assert_eq!(rec.0.lock().unwrap().len(), 10);
        let delivered = *slow.0.lock().unwrap();
        assert!((1..10).contains(&delivered), "delivered {delivered}");
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
