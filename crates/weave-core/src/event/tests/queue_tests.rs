use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::event::queue::FALLBACK_NOTICE;
use crate::event::{handler, EventBus, EventData, FallbackSink, LogCategory, LogRecord, StartupQueue, LOG};

fn capture() -> (FallbackSink, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    let sink: FallbackSink = Arc::new(move |line: &str| {
        sink_lines.lock().unwrap().push(line.to_string());
    });
    (sink, lines)
}

#[test]
fn test_flush_preserves_fifo_order() {
    let mut queue = StartupQueue::new();
    queue.log(LogCategory::Log, "one");
    queue.enqueue("custom", json!(2));
    queue.log(LogCategory::Warn, "three");
    assert_eq!(queue.len(), 3);

    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for interface in [LOG, "custom"] {
        let seen = Arc::clone(&seen);
        bus.subscribe(
            interface,
            handler(move |_bus: &EventBus, data: &EventData| {
                let entry = match LogRecord::from_data(data) {
                    Ok(record) => record.message,
                    Err(_) => data.to_string(),
                };
                seen.lock().unwrap().push(entry);
            }),
        )
        .unwrap();
    }

    let (sink, dumped) = capture();
    assert_eq!(queue.flush(&bus, &sink), 3);
    assert_eq!(*seen.lock().unwrap(), vec!["one", "2", "three"]);
    assert!(dumped.lock().unwrap().is_empty());
}

#[test]
fn test_flush_dumps_to_fallback_without_log_consumer() {
    let mut queue = StartupQueue::new();
    queue.log(LogCategory::Log, "Loading features.");
    queue.enqueue("custom", json!("not a log"));
    queue.warn("Interface x can be called but is not implemented or monitored by anything.");

    let (sink, dumped) = capture();
    queue.flush(&EventBus::new(), &sink);

    let dumped = dumped.lock().unwrap();
    assert_eq!(dumped.len(), 3);
    assert_eq!(dumped[0], FALLBACK_NOTICE);
    assert!(dumped[1].ends_with("LOG: Loading features."));
    assert!(dumped[2].contains("WARN: Interface x"));
}

#[test]
fn test_log_messages_lists_only_log_events() {
    let mut queue = StartupQueue::new();
    queue.enqueue("custom", json!({}));
    queue.log(LogCategory::Fine, "detail");
    assert_eq!(queue.log_messages(), vec!["detail".to_string()]);
    assert!(!queue.is_empty());
}
