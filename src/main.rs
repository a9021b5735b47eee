//! servicevisor: hosts the store, consumer and generic services plus an HTTP
//! health endpoint, and shuts them all down together on SIGINT/SIGTERM.
//!
//! # Usage
//!
//! ```text
//! servicevisor [--bind ADDR] [--grace-secs N] [--drain-secs N] [--fail-service NAME]
//! ```
//!
//! Flags fall back to `SERVICEVISOR_BIND`, `SERVICEVISOR_GRACE_SECS` and
//! `SERVICEVISOR_DRAIN_SECS`. Log verbosity follows `RUST_LOG`.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servicevisor::{
    HttpListener, LogWriter, RepeatPolicy, ServiceError, ServiceRef, StubService, Subscribe,
    Supervisor, SupervisorConfig,
};

/// Placeholder services hosted by the binary, in registration order.
const SERVICES: [&str; 3] = ["store", "consumer", "any"];

#[derive(Parser, Debug)]
#[command(name = "servicevisor")]
#[command(about = "Runs several services and an HTTP endpoint, stopping them together", long_about = None)]
struct Args {
    /// Address the HTTP endpoint binds to.
    #[arg(long, env = "SERVICEVISOR_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Seconds every unit gets to finish after shutdown starts (0 = unbounded).
    #[arg(long, env = "SERVICEVISOR_GRACE_SECS", default_value_t = 30)]
    grace_secs: u64,

    /// Seconds in-flight HTTP requests get to complete during drain.
    #[arg(long, env = "SERVICEVISOR_DRAIN_SECS", default_value_t = 10)]
    drain_secs: u64,

    /// Make the named service fail to connect (exercises fail-fast shutdown).
    #[arg(long, value_name = "NAME")]
    fail_service: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "servicevisor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let cfg = SupervisorConfig {
        grace: Duration::from_secs(args.grace_secs),
        drain_deadline: Duration::from_secs(args.drain_secs),
        repeat_signal: RepeatPolicy::ForceExit,
        ..SupervisorConfig::default()
    };
    tracing::info!(
        bind = %args.bind,
        grace_secs = args.grace_secs,
        drain_secs = args.drain_secs,
        "configuration loaded"
    );

    let router = Router::new().route("/health", get(|| async { "ok" }));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg)
        .with_subscribers(subs)
        .with_listener(HttpListener::new(args.bind, router))
        .build();

    for name in SERVICES {
        let service: ServiceRef = if args.fail_service.as_deref() == Some(name) {
            Arc::new(StubService::failing(
                name,
                ServiceError::connection("connection refused"),
            ))
        } else {
            Arc::new(StubService::new(name))
        };
        if let Err(err) = sup.register(service) {
            tracing::error!(error = %err, label = err.as_label(), "fatal: invalid setup");
            return ExitCode::from(err.exit_code());
        }
    }

    let outcomes = match sup.run().await {
        Ok(outcomes) => outcomes,
        Err(err) => {
            tracing::error!(error = %err, label = err.as_label(), "fatal: supervisor could not run");
            return ExitCode::from(err.exit_code());
        }
    };

    let aggregate = outcomes.aggregate();
    if aggregate.is_success() {
        tracing::info!("all services stopped cleanly");
    } else {
        tracing::error!(outcome = %aggregate, "fatal: shutdown completed with errors");
    }
    ExitCode::from(aggregate.exit_code())
}
