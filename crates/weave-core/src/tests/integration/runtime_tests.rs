use serde_json::json;

use crate::kernel::error::Error;
use crate::kernel::ComposeMode;
use crate::reload::error::ReloadError;
use crate::runtime::Runtime;
use crate::tests::integration::common::Fixture;
use crate::tests::support::{calls, request, snapshot, TransferProbe};

#[test]
fn test_cold_start_raises_start_once_after_startup_logs() {
    let fixture = Fixture::basic();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();

    let kernel = runtime.current().unwrap();
    assert_eq!(kernel.generation(), 1);
    assert_eq!(kernel.mode(), ComposeMode::ColdStart);
    assert_eq!(snapshot(&fixture.client_calls), vec!["client:start"]);

    let logs = snapshot(&fixture.logs);
    let assembled = logs
        .iter()
        .position(|l| l == "LOG: Program assembled, emitting events queued during startup.")
        .unwrap();
    let ready = logs
        .iter()
        .position(|l| l == "LOG: Program is ready, starting program.")
        .unwrap();
    assert!(assembled < ready);
    assert!(snapshot(&fixture.fallback).is_empty());
}

#[test]
fn test_reload_carries_cache_state_to_new_generation() {
    let fixture = Fixture::basic();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();

    runtime.current().unwrap().publish("request", &request("index"));
    runtime.reload().unwrap();

    let current = runtime.current().unwrap();
    assert_eq!(current.generation(), 2);
    assert_eq!(current.mode(), ComposeMode::Reload);
    current.publish("request", &request("index"));

    assert_eq!(snapshot(&fixture.answers), vec!["miss index", "hit INDEX"]);
    assert_eq!(
        snapshot(&fixture.client_calls),
        vec!["client:start"],
        "start is not raised again on reload"
    );
    assert_eq!(fixture.client.exit_count(), 1, "old generation exited");
    assert!(snapshot(&fixture.logs)
        .contains(&"LOG: Redirecting pending events to the new program instance.".to_string()));
}

#[test]
fn test_events_sent_to_retired_kernel_reach_new_one_once() {
    let fixture = Fixture::basic();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();
    let old = runtime.current().unwrap();
    old.publish("request", &request("a"));

    runtime.reload().unwrap();
    assert!(old.bus().is_retired());
    assert_eq!(old.publish("request", &request("a")), 1);

    assert_eq!(snapshot(&fixture.answers), vec!["miss a", "hit A"]);
}

#[test]
fn test_failed_rebuild_keeps_current_program() {
    let fixture = Fixture::basic();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();
    runtime.current().unwrap().publish("request", &request("page"));

    fixture.write_config(json!({
        "dependencies": { "collector": {}, "client": {}, "cache": {}, "ghost": {} }
    }));
    let err = runtime.reload().unwrap_err();
    assert!(matches!(err, Error::Reload(ReloadError::Rebuild { .. })));

    let current = runtime.current().unwrap();
    assert_eq!(current.generation(), 1);
    assert!(!current.is_exited());
    assert!(!current.bus().is_retired());
    current.publish("request", &request("page"));
    assert_eq!(snapshot(&fixture.answers), vec!["miss page", "hit PAGE"]);
    assert!(snapshot(&fixture.logs)
        .iter()
        .any(|l| l.starts_with("ERROR: Rebuild failed, keeping the current program:")));

    // A repaired config reloads normally and the state is still there.
    fixture.write_config(json!({
        "dependencies": { "collector": {}, "client": {}, "cache": {} }
    }));
    runtime.reload().unwrap();
    let current = runtime.current().unwrap();
    assert_eq!(current.generation(), 3);
    current.publish("request", &request("page"));
    assert_eq!(snapshot(&fixture.answers).last().unwrap(), "hit PAGE");
}

#[test]
fn test_reload_applies_config_changes() {
    let fixture = Fixture::basic();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();
    assert!(runtime.current().unwrap().feature("test.cache").is_some());

    fixture.write_config(json!({ "dependencies": { "collector": {}, "client": {} } }));
    runtime.reload().unwrap();

    let current = runtime.current().unwrap();
    assert!(current.feature("test.cache").is_none());
    assert_eq!(current.publish("request", &request("x")), 0);
}

#[test]
fn test_shutdown_exits_once_and_blocks_reload() {
    let fixture = Fixture::basic();
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();

    assert!(runtime.shutdown());
    assert!(!runtime.shutdown());
    assert!(runtime.is_shut_down());
    assert_eq!(fixture.client.exit_count(), 1);

    let err = runtime.reload().unwrap_err();
    assert!(matches!(err, Error::Reload(ReloadError::RuntimeGone)));
    assert!(!runtime.handle().is_alive());

    drop(runtime);
    assert_eq!(fixture.client.exit_count(), 1);
}

#[test]
fn test_failed_cold_start_reports_error() {
    let fixture = Fixture::new(json!({ "dependencies": { "nobody": {} } }));
    let err = Runtime::start(fixture.catalog(), fixture.options()).unwrap_err();
    assert!(err.to_string().contains("nobody"));
}

#[test]
fn test_reload_logs_each_transfer_step() {
    let transfers = calls();
    let fixture = Fixture::with_transfer(TransferProbe::new("test.transfer", &transfers));
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();

    runtime.reload().unwrap();

    assert_eq!(
        snapshot(&transfers),
        vec!["test.transfer:start", "test.transfer:save", "test.transfer:load blob"]
    );
    let logs = snapshot(&fixture.logs);
    let step = |line: &str| {
        logs.iter()
            .position(|l| l == line)
            .unwrap_or_else(|| panic!("missing log line {:?}", line))
    };
    let saving = step("LOG: Saving existing state of feature test.transfer.");
    let compiling = step("LOG: Compiling new program instance.");
    let transferring = step("LOG: Transferring saved state of feature test.transfer.");
    let redirecting = step("LOG: Redirecting pending events to the new program instance.");
    assert!(saving < compiling);
    assert!(compiling < transferring);
    assert!(transferring < redirecting);
}

#[test]
fn test_rejected_state_falls_back_to_fresh_start() {
    let transfers = calls();
    let fixture = Fixture::with_transfer(
        TransferProbe::new("test.transfer", &transfers).rejecting_blobs(),
    );
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();
    runtime.current().unwrap().publish("request", &request("kept"));

    runtime.reload().unwrap();

    let current = runtime.current().unwrap();
    assert_eq!(current.generation(), 2);
    assert!(current.feature("test.transfer").is_some());
    assert_eq!(
        snapshot(&transfers),
        vec![
            "test.transfer:start",
            "test.transfer:save",
            "test.transfer:load blob",
            "test.transfer:load empty",
        ]
    );
    assert!(snapshot(&fixture.logs).iter().any(|l| l.starts_with(
        "ERROR: State transfer for feature test.transfer failed; initializing from scratch."
    )));

    // Other features still received their state.
    current.publish("request", &request("kept"));
    assert_eq!(snapshot(&fixture.answers), vec!["miss kept", "hit KEPT"]);
}

#[test]
fn test_failed_save_reloads_with_empty_state() {
    let transfers = calls();
    let fixture = Fixture::with_transfer(
        TransferProbe::new("test.transfer", &transfers).failing_save(),
    );
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();

    runtime.reload().unwrap();

    assert_eq!(runtime.current().unwrap().generation(), 2);
    assert_eq!(
        snapshot(&transfers),
        vec!["test.transfer:start", "test.transfer:save", "test.transfer:load empty"]
    );
    let logs = snapshot(&fixture.logs);
    assert!(logs
        .iter()
        .any(|l| l.starts_with("ERROR: Saving state of feature test.transfer failed:")));
    assert!(!logs
        .iter()
        .any(|l| l == "LOG: Transferring saved state of feature test.transfer."));
}

#[test]
fn test_rollback_leaves_features_without_saved_state_alone() {
    let transfers = calls();
    let fixture = Fixture::with_transfer(
        TransferProbe::new("test.transfer", &transfers).load_only(),
    );
    let runtime = Runtime::start(fixture.catalog(), fixture.options()).unwrap();

    fixture.write_config(json!({
        "dependencies": { "collector": {}, "client": {}, "cache": {}, "transfer": {}, "ghost": {} }
    }));
    runtime.reload().unwrap_err();
    assert_eq!(runtime.current().unwrap().generation(), 1);
    assert_eq!(snapshot(&transfers), vec!["test.transfer:start"]);

    // A successful rebuild still initializes the new instance.
    fixture.write_config(json!({
        "dependencies": { "collector": {}, "client": {}, "cache": {}, "transfer": {} }
    }));
    runtime.reload().unwrap();
    assert_eq!(
        snapshot(&transfers),
        vec!["test.transfer:start", "test.transfer:load empty"]
    );
}
