//! # Weave Event System
//!
//! Interfaces are plain names. Features bind [`Handler`]s to them on an
//! [`EventBus`] and raise events by publishing [`EventData`] under a name.
//! Dispatch is synchronous and re-entrant: a handler may publish further
//! events and they are delivered immediately, depth first.
//!
//! Before wiring completes nothing is bound yet, so events raised during a
//! compose pass go to the [`StartupQueue`](queue::StartupQueue) and are
//! flushed in order once the program is assembled.
pub mod bus;
pub mod error;
pub mod queue;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::error::EventError;

/// Payload carried by every event.
pub type EventData = serde_json::Value;

/// Identifier of one bus subscription.
pub type SubscriptionId = u64;

/// Callback bound to an interface. Receives the bus that dispatched the event.
pub type Handler = Arc<dyn Fn(&EventBus, &EventData) + Send + Sync>;

/// Program-ready signal, raised once after wiring and flush.
pub const START: &str = "start";

/// Structured diagnostic interface.
pub const LOG: &str = "log";

/// Root interfaces every program is traced from.
pub const ROOT_INTERFACES: [&str; 2] = [LOG, START];

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&EventBus, &EventData) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Category of a `log` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogCategory {
    Error,
    Warn,
    Log,
    Fine,
    Finer,
    Finest,
}

impl LogCategory {
    pub const ALL: [LogCategory; 6] = [
        LogCategory::Error,
        LogCategory::Warn,
        LogCategory::Log,
        LogCategory::Fine,
        LogCategory::Finer,
        LogCategory::Finest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Error => "ERROR",
            LogCategory::Warn => "WARN",
            LogCategory::Log => "LOG",
            LogCategory::Fine => "FINE",
            LogCategory::Finer => "FINER",
            LogCategory::Finest => "FINEST",
        }
    }

    /// Parse the upper-case category name used on the wire and in config.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Matching level of the `log` facade.
    pub fn level(&self) -> log::Level {
        match self {
            LogCategory::Error => log::Level::Error,
            LogCategory::Warn => log::Level::Warn,
            LogCategory::Log => log::Level::Info,
            LogCategory::Fine => log::Level::Debug,
            LogCategory::Finer | LogCategory::Finest => log::Level::Trace,
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of the `log` interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub category: LogCategory,
    pub message: String,
}

impl LogRecord {
    /// Create a record stamped with the current time.
    pub fn new(category: LogCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogCategory::Error, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogCategory::Warn, message)
    }

    pub fn log(message: impl Into<String>) -> Self {
        Self::new(LogCategory::Log, message)
    }

    /// Convert into bus payload.
    pub fn to_data(&self) -> EventData {
        // Serializing a struct of plain fields cannot fail.
        serde_json::to_value(self).unwrap_or(EventData::Null)
    }

    /// Read a record back out of bus payload.
    pub fn from_data(data: &EventData) -> std::result::Result<Self, EventError> {
        serde_json::from_value(data.clone()).map_err(|e| EventError::InvalidEventData {
            interface: LOG.to_string(),
            details: e.to_string(),
        })
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            self.timestamp.to_rfc3339(),
            self.category,
            self.message
        )
    }
}

/// An event held for later delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub interface: String,
    pub data: EventData,
}

impl Event {
    pub fn new(interface: impl Into<String>, data: EventData) -> Self {
        Self {
            interface: interface.into(),
            data,
        }
    }

    /// A `log` event carrying `record`.
    pub fn log(record: LogRecord) -> Self {
        Self::new(LOG, record.to_data())
    }

    /// The log record this event carries, when it is log-shaped.
    pub fn as_log_record(&self) -> Option<LogRecord> {
        LogRecord::from_data(&self.data).ok()
    }
}

pub use bus::EventBus;
pub use queue::{FallbackSink, StartupQueue};

#[cfg(test)]
mod tests;
