mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use common::{PROMPT, Recorder, Scripted, StartScript, free_addr};
use servicevisor::{
    Aggregate, EventKind, HttpListener, Subscribe, Supervisor, SupervisorConfig, UnitError,
    UnitKind,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn router() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        )
}

async fn connect(addr: &str) -> TcpStream {
    let deadline = tokio::time::Instant::now() + PROMPT;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return stream,
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(err) => panic!("listener never came up on {addr}: {err}"),
        }
    }
}

fn request(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
}

#[tokio::test]
async fn test_drain_within_deadline_succeeds() {
    let addr = free_addr();
    let recorder = Recorder::new();
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
    let sup = Supervisor::builder(SupervisorConfig {
        drain_deadline: Duration::from_secs(2),
        ..SupervisorConfig::default()
    })
    .with_subscribers(subs)
    .with_listener(HttpListener::new(addr.clone(), router()))
    .build();

    let services: Vec<_> = ["store", "consumer", "any"]
        .into_iter()
        .map(|name| Scripted::new(name, StartScript::UntilCancelled))
        .collect();
    for svc in &services {
        sup.register(svc.clone()).unwrap();
    }
    sup.launch().unwrap();

    let mut stream = connect(&addr).await;
    stream.write_all(request("/health").as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("ok"), "{response}");

    sup.shutdown();
    let outcomes = tokio::time::timeout(PROMPT, sup.wait())
        .await
        .expect("wait must return")
        .unwrap();

    assert_eq!(outcomes.aggregate(), Aggregate::Success);
    assert_eq!(outcomes.exit_code(), 0);
    assert!(services.iter().all(|s| s.stops() == 1));

    let http = outcomes.iter().last().unwrap();
    assert_eq!(http.name(), "http");
    assert_eq!(http.kind(), UnitKind::Listener);

    assert_eq!(recorder.count(EventKind::ListenerBound), 1);
    assert_eq!(recorder.count(EventKind::DrainStarted), 1);
    assert_eq!(recorder.count(EventKind::DrainCompleted), 1);
    assert_eq!(recorder.count(EventKind::DrainTimedOut), 0);

    // no longer accepting
    assert!(TcpStream::connect(&addr).await.is_err());
}

#[tokio::test]
async fn test_slow_request_exceeds_drain_deadline() {
    let addr = free_addr();
    let deadline = Duration::from_millis(200);
    let sup = Supervisor::builder(SupervisorConfig {
        drain_deadline: deadline,
        grace: Duration::from_secs(10),
        ..SupervisorConfig::default()
    })
    .with_listener(HttpListener::new(addr.clone(), router()))
    .build();

    let store = Scripted::new("store", StartScript::UntilCancelled);
    let any = Scripted::new("any", StartScript::UntilCancelled);
    sup.register(store.clone()).unwrap();
    sup.register(any.clone()).unwrap();
    sup.launch().unwrap();

    let mut stream = connect(&addr).await;
    stream.write_all(request("/slow").as_bytes()).await.unwrap();
    // let the handler pick the request up
    tokio::time::sleep(Duration::from_millis(100)).await;

    sup.shutdown();
    let outcomes = tokio::time::timeout(PROMPT, sup.wait())
        .await
        .expect("drain deadline must bound wait")
        .unwrap();

    let http = outcomes.get("http").unwrap();
    assert_eq!(http.stop(), &Err(UnitError::DrainTimeout { deadline }));
    assert_eq!(http.run(), &Ok(()));

    // partial failure stays isolated
    for name in ["store", "any"] {
        let unit = outcomes.get(name).unwrap();
        assert!(unit.is_success(), "{name}: {unit:?}");
    }
    assert_eq!(store.stops(), 1);
    assert_eq!(any.stops(), 1);

    let aggregate = outcomes.aggregate();
    assert_eq!(
        aggregate,
        Aggregate::Failure {
            unit: "http".into(),
            error: UnitError::DrainTimeout { deadline },
        }
    );
    assert_eq!(aggregate.exit_code(), 6);

    // the in-flight request was cut off, not answered late
    let mut response = String::new();
    let read = tokio::time::timeout(Duration::from_secs(1), stream.read_to_string(&mut response))
        .await
        .expect("connection must be closed once wait returns");
    if read.is_ok() {
        assert!(response.is_empty(), "unexpected response: {response}");
    }
}

#[tokio::test]
async fn test_bind_failure_is_fatal() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap().to_string();

    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_listener(HttpListener::new(addr.clone(), router()))
        .build();
    let store = Scripted::new("store", StartScript::UntilCancelled);
    sup.register(store.clone()).unwrap();
    sup.launch().unwrap();

    let outcomes = tokio::time::timeout(PROMPT, sup.wait())
        .await
        .expect("a bind failure must trigger cancellation")
        .unwrap();

    assert_eq!(store.stops(), 1);
    match outcomes.aggregate() {
        Aggregate::Failure {
            unit,
            error: UnitError::ListenerBind { addr: failed, .. },
        } => {
            assert_eq!(unit, "http");
            assert_eq!(failed, addr);
        }
        other => panic!("expected bind failure, got {other:?}"),
    }
    assert_eq!(outcomes.exit_code(), 4);
    // drain has nothing to do after a failed bind
    assert_eq!(outcomes.get("http").unwrap().stop(), &Ok(()));
    drop(occupied);
}

#[tokio::test]
async fn test_listener_name_must_be_unique() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_listener(HttpListener::new(free_addr(), router()).with_name("api"))
        .build();
    let err = sup
        .register(Scripted::new("api", StartScript::UntilCancelled))
        .unwrap_err();
    assert_eq!(err.as_label(), "config_duplicate_name");
}
