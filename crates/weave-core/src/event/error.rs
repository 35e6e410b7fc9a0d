//! # Weave Event System Errors
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid event data for interface '{interface}': {details}")]
    InvalidEventData { interface: String, details: String },

    #[error("Cannot subscribe to interface '{interface}': bus has been retired")]
    BusRetired { interface: String },
}
