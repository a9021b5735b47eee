//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use servicevisor::{Event, EventKind, Service, ServiceError, Subscribe};
use tokio_util::sync::CancellationToken;

/// Upper bound for anything that must happen "promptly".
pub const PROMPT: Duration = Duration::from_secs(5);

/// Subscriber that keeps every event it sees.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds_for(&self, unit: &str) -> Vec<EventKind> {
        self.events()
            .into_iter()
            .filter(|e| e.unit.as_deref() == Some(unit))
            .map(|e| e.kind)
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind == kind).count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "Recorder"
    }
}

/// How a scripted service's `start` behaves.
#[derive(Clone)]
pub enum StartScript {
    /// Block until cancelled, then return `Ok`.
    UntilCancelled,
    /// Return `err` after `after`.
    FailAfter(Duration, ServiceError),
    /// Ignore cancellation entirely.
    Hang,
}

/// Service with scripted behavior that counts its calls.
pub struct Scripted {
    name: String,
    start: StartScript,
    stop_result: Result<(), ServiceError>,
    stop_delay: Duration,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub start_returned: AtomicUsize,
}

impl Scripted {
    pub fn new(name: &str, start: StartScript) -> Arc<Self> {
        Self::build(name, start, Ok(()), Duration::ZERO)
    }

    pub fn build(
        name: &str,
        start: StartScript,
        stop_result: Result<(), ServiceError>,
        stop_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            start,
            stop_result,
            stop_delay,
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            start_returned: AtomicUsize::new(0),
        })
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Service for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let res = match &self.start {
            StartScript::UntilCancelled => {
                ctx.cancelled().await;
                Ok(())
            }
            StartScript::FailAfter(after, err) => {
                tokio::time::sleep(*after).await;
                Err(err.clone())
            }
            StartScript::Hang => std::future::pending().await,
        };
        self.start_returned.fetch_add(1, Ordering::SeqCst);
        res
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
        }
        self.stop_result.clone()
    }
}

/// Returns a loopback address with a port that was free a moment ago.
pub fn free_addr() -> String {
    let probe = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);
    addr.to_string()
}
