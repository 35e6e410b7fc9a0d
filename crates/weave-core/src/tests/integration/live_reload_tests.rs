use std::fs;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

use crate::runtime::Runtime;
use crate::tests::integration::common::Fixture;
use crate::tests::support::{request, snapshot};

fn watched_fixture() -> Fixture {
    Fixture::new(json!({
        "dependencies": { "collector": {}, "client": {}, "cache": {}, "dynamo": {} },
        "dynamo": { "config": true, "delay": 100, "poll_interval": 20 }
    }))
}

fn generation(runtime: &Runtime) -> u64 {
    runtime.current().map(|k| k.generation()).unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn test_config_edit_rebuilds_program() {
    let fixture = watched_fixture();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();
    runtime.current().unwrap().publish("request", &request("home"));
    assert!(snapshot(&fixture.logs).contains(&"LOG: Watching config for changes.".to_string()));

    fs::write(fixture.root.path().join("app/extra.json"), r#"{"theme": "dark"}"#).unwrap();
    sleep(Duration::from_millis(1000)).await;

    assert_eq!(generation(&runtime), 2);
    let current = runtime.current().unwrap();
    assert_eq!(current.config().get::<String>("extra.theme").as_deref(), Some("dark"));
    current.publish("request", &request("home"));
    assert_eq!(snapshot(&fixture.answers), vec!["miss home", "hit HOME"]);

    // The orchestrator carried over, so the next edit is seen too.
    fs::write(fixture.root.path().join("app/more.json"), "{}").unwrap();
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(generation(&runtime), 3);
}

#[tokio::test(start_paused = true)]
async fn test_edits_after_shutdown_are_ignored() {
    let fixture = watched_fixture();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();
    runtime.shutdown();

    fs::write(fixture.root.path().join("app/extra.json"), "{}").unwrap();
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(generation(&runtime), 1);
}

#[tokio::test(start_paused = true)]
async fn test_broken_edit_rolls_back_and_keeps_watching() {
    let fixture = watched_fixture();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();

    fs::write(fixture.root.path().join("app/broken.json"), "{ not json").unwrap();
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(generation(&runtime), 1);
    assert!(snapshot(&fixture.logs)
        .iter()
        .any(|l| l.starts_with("ERROR: Rebuild failed")));

    // The failed pass still consumed a generation number.
    fs::remove_file(fixture.root.path().join("app/broken.json")).unwrap();
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(generation(&runtime), 3);
}
