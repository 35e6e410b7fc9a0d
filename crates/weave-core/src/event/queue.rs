use std::collections::VecDeque;
use std::sync::Arc;

use crate::event::{Event, EventBus, EventData, LOG, LogCategory, LogRecord};

/// Output used when no feature consumes `log` after the startup flush.
pub type FallbackSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Notice written to the fallback sink before the dumped records.
pub const FALLBACK_NOTICE: &str =
    "log interface not implemented or monitored, dumping startup events to stdout.";

/// Sink that prints each line to standard output.
pub fn stdout_sink() -> FallbackSink {
    Arc::new(|line: &str| println!("{}", line))
}

/// Ordered buffer for events raised before wiring completes.
#[derive(Debug, Default)]
pub struct StartupQueue {
    events: VecDeque<Event>,
}

impl StartupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, interface: impl Into<String>, data: EventData) {
        self.events.push_back(Event::new(interface, data));
    }

    /// Queue a `log` event.
    pub fn log(&mut self, category: LogCategory, message: impl Into<String>) {
        let record = LogRecord::new(category, message);
        log::trace!("{}: {}", record.category, record.message);
        self.events.push_back(Event::log(record));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogCategory::Warn, message);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Messages of the queued `log` events, in order.
    pub fn log_messages(&self) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e.interface == LOG)
            .filter_map(|e| e.as_log_record())
            .map(|r| r.message)
            .collect()
    }

    /// Deliver every queued event on `bus` in the order raised.
    ///
    /// When nothing is bound to `log`, the queued log records are written to
    /// `fallback` instead. Returns the number of events dispatched.
    pub fn flush(self, bus: &EventBus, fallback: &FallbackSink) -> usize {
        if !bus.has_subscribers(LOG) {
            fallback(FALLBACK_NOTICE);
            for record in self.events.iter().filter_map(|e| {
                if e.interface == LOG { e.as_log_record() } else { None }
            }) {
                fallback(&record.to_string());
            }
        }
        let count = self.events.len();
        for event in self.events {
            bus.publish(&event.interface, &event.data);
        }
        count
    }
}
