//! # Weave Hot Reload ("dynamo")
//!
//! Watches source locations and rebuilds the whole program when they change.
//!
//! - [`watcher`]: polling directory watches, one tokio task per directory.
//! - [`scheduler`]: the debounce state machine
//!   (`Idle -> Debouncing -> Rebuilding -> Idle`).
//! - [`dynamo`]: the feature that owns both and carries them across reloads
//!   through its own `save`/`load` hooks.
pub mod dynamo;
pub mod error;
pub mod scheduler;
pub mod watcher;

pub use dynamo::{DynamoFeature, DynamoSettings};
pub use error::ReloadError;
pub use scheduler::{ReloadPhase, ReloadScheduler, ReloadTarget};
pub use watcher::{WatchHandle, WatchNotice, WatchScope, WatchSet};

#[cfg(test)]
mod tests;
