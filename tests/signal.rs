//! OS signal delivery end to end. Kept in its own test binary because it
//! signals the whole test process.
#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{PROMPT, Recorder, Scripted, StartScript};
use servicevisor::{
    Aggregate, EventKind, OsSignal, ShutdownCause, Subscribe, Supervisor, SupervisorConfig,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sigterm_cancels_every_service() {
    let recorder = Recorder::new();
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
    let sup = Arc::new(
        Supervisor::builder(SupervisorConfig {
            grace: Duration::from_secs(5),
            ..SupervisorConfig::default()
        })
        .with_subscribers(subs)
        .build(),
    );

    let services: Vec<_> = ["store", "consumer", "any"]
        .into_iter()
        .map(|name| Scripted::new(name, StartScript::UntilCancelled))
        .collect();
    for svc in &services {
        sup.register(svc.clone()).unwrap();
    }

    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        async move { sup.run().await }
    });

    // handlers are installed before launch, so a started service means they are live
    tokio::time::timeout(PROMPT, async {
        while services.iter().any(|s| s.starts() == 0) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("services must start");
    assert!(!sup.signal().is_fired());

    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .expect("kill must be available");
    assert!(status.success());

    let outcomes = tokio::time::timeout(PROMPT, runner)
        .await
        .expect("SIGTERM must end the run")
        .unwrap()
        .unwrap();

    assert_eq!(
        outcomes.cause(),
        Some(&ShutdownCause::Signal(OsSignal::Terminate))
    );
    assert_eq!(outcomes.aggregate(), Aggregate::Success);
    assert_eq!(outcomes.exit_code(), 0);
    assert!(services.iter().all(|s| s.stops() == 1));
    assert_eq!(recorder.count(EventKind::ShutdownRequested), 1);
}
