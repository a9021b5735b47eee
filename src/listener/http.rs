//! # HTTP endpoint with bounded graceful drain.
//!
//! [`HttpListener`] binds a TCP address and serves an [`axum::Router`]. It is
//! supervised as a unit of its own, split into two tasks like a service:
//!
//! ```text
//! serve task:
//!   bind ──(err)──► publish ListenerFailed → fire UnitFailed → Err(ListenerBind)
//!     │
//!     └─► publish ListenerBound → accept loop (one task per connection, owned by serve)
//!           ctx cancelled → stop accepting → graceful close of every connection
//!                         → publish ListenerClosed → Ok
//!           accept fails  → publish ListenerFailed → fire UnitFailed → Err(ListenerServe)
//!
//! drain task:
//!   shutdown.fired() → publish DrainStarted
//!     serve finished within deadline → publish DrainCompleted → Ok
//!     deadline elapsed → abort serve (drops in-flight connections)
//!                      → publish DrainTimedOut → Err(DrainTimeout)
//! ```
//!
//! ## Rules
//! - Once the signal fires no new connections are accepted.
//! - In-flight requests get at most `drain_deadline` to complete; after that
//!   their connections are closed without a response.
//! - A drain timeout is recorded; it does not fire the signal (it already fired).

use std::io;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    core::CancellationSignal,
    error::UnitError,
    events::{Bus, Event, EventKind},
};

/// Default unit name of the listener in outcomes and events.
pub const DEFAULT_LISTENER_NAME: &str = "http";

/// HTTP endpoint supervised alongside the services.
///
/// # Example
/// ```rust
/// use axum::{Router, routing::get};
/// use servicevisor::HttpListener;
///
/// let router = Router::new().route("/health", get(|| async { "ok" }));
/// let listener = HttpListener::new("127.0.0.1:8080", router);
/// assert_eq!(listener.name(), "http");
/// assert_eq!(listener.addr(), "127.0.0.1:8080");
/// ```
#[derive(Clone, Debug)]
pub struct HttpListener {
    name: String,
    addr: String,
    router: Router,
}

impl HttpListener {
    /// Creates a listener for `addr` (anything [`TcpListener::bind`] accepts, e.g. `"0.0.0.0:8080"`).
    pub fn new(addr: impl Into<String>, router: Router) -> Self {
        Self {
            name: DEFAULT_LISTENER_NAME.to_owned(),
            addr: addr.into(),
            router,
        }
    }

    /// Overrides the unit name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured bind address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Binds and serves until `ctx` is cancelled and every connection has closed.
    ///
    /// `served` is cancelled when this future finishes or is dropped.
    pub(crate) async fn serve(
        self,
        ctx: CancellationToken,
        served: CancellationToken,
        shutdown: CancellationSignal,
        bus: Bus,
    ) -> Result<(), UnitError> {
        let _served = served.drop_guard();
        if ctx.is_cancelled() {
            return Ok(());
        }

        let listener = match TcpListener::bind(&self.addr).await {
            Ok(listener) => listener,
            Err(err) => {
                let err = UnitError::ListenerBind {
                    addr: self.addr.clone(),
                    error: err.to_string(),
                };
                self.fail(&err, &shutdown, &bus);
                return Err(err);
            }
        };

        let mut bound = Event::new(EventKind::ListenerBound).with_unit(self.name.as_str());
        if let Ok(local) = listener.local_addr() {
            bound = bound.with_addr(local);
        }
        bus.publish(bound);

        let builder = AutoBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let service = TowerToHyperService::new(self.router.clone());
        // owned by this future: aborting serve drops every in-flight connection
        let mut conns = JoinSet::new();

        let accepted = loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break Ok(()),
                Some(_) = conns.join_next(), if !conns.is_empty() => {}
                res = listener.accept() => match res {
                    Ok((socket, peer)) => {
                        if let Err(err) = socket.set_nodelay(true) {
                            tracing::debug!(%peer, error = %err, "failed to set TCP_NODELAY");
                        }
                        let conn = builder
                            .serve_connection_with_upgrades(TokioIo::new(socket), service.clone())
                            .into_owned();
                        let conn = graceful.watch(conn);
                        conns.spawn(async move {
                            if let Err(err) = conn.await {
                                tracing::debug!(%peer, error = %err, "connection closed with error");
                            }
                        });
                    }
                    Err(err) if is_connection_error(&err) => {
                        tracing::debug!(error = %err, "accepted connection failed");
                    }
                    Err(err) => break Err(err),
                },
            }
        };
        drop(listener);

        match accepted {
            Ok(()) => {
                graceful.shutdown().await;
                while conns.join_next().await.is_some() {}
                bus.publish(Event::new(EventKind::ListenerClosed).with_unit(self.name.as_str()));
                Ok(())
            }
            Err(err) => {
                let err = UnitError::ListenerServe {
                    addr: self.addr.clone(),
                    error: err.to_string(),
                };
                self.fail(&err, &shutdown, &bus);
                Err(err)
            }
        }
    }

    fn fail(&self, err: &UnitError, shutdown: &CancellationSignal, bus: &Bus) {
        bus.publish(
            Event::new(EventKind::ListenerFailed)
                .with_unit(self.name.as_str())
                .with_reason(err.to_string()),
        );
        shutdown.escalate(&self.name, err);
    }
}

/// Per-connection accept failures; the listening socket itself is still usable.
fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Waits for cancellation, then bounds the serve task's graceful drain by `deadline`.
pub(crate) async fn drain(
    name: String,
    served: CancellationToken,
    serve: AbortHandle,
    deadline: Duration,
    shutdown: CancellationSignal,
    bus: Bus,
) -> Result<(), UnitError> {
    shutdown.fired().await;
    // serve already over (bind failure, or cancelled before binding)
    if served.is_cancelled() {
        return Ok(());
    }

    bus.publish(
        Event::new(EventKind::DrainStarted)
            .with_unit(name.as_str())
            .with_deadline(deadline),
    );

    match tokio::time::timeout(deadline, served.cancelled()).await {
        Ok(()) => {
            bus.publish(Event::new(EventKind::DrainCompleted).with_unit(name.as_str()));
            Ok(())
        }
        Err(_elapsed) => {
            serve.abort();
            bus.publish(
                Event::new(EventKind::DrainTimedOut)
                    .with_unit(name.as_str())
                    .with_deadline(deadline),
            );
            Err(UnitError::DrainTimeout { deadline })
        }
    }
}
