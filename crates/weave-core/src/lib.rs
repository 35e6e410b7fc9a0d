//! # weave-core
//!
//! Composition kernel for weave programs. Independently written feature
//! modules declare the interfaces they implement, monitor and emit; the kernel
//! resolves those declarations into one wired event-dispatch program, prunes
//! whatever is unreachable from the root interfaces, and can rebuild the whole
//! program at runtime while carrying feature state across the cutover.
pub mod config;
pub mod event;
pub mod feature;
pub mod kernel;
pub mod reload;
pub mod runtime;
pub mod utils;
pub mod wiring;

// Re-export key public types for the binary and feature crates
pub use config::{CommandLine, ConfigTree};
pub use event::{EventBus, EventData, Handler, LogCategory, LogRecord};
pub use feature::{
    Capabilities, Feature, FeatureCatalog, FeatureDescriptor, FeatureModule, ModuleContext,
    StateBlob,
};
pub use kernel::error::Error as KernelError;
pub use kernel::{ComposeMode, ComposeOptions, Composer, Kernel};
pub use runtime::{Runtime, RuntimeHandle};

#[cfg(test)]
mod tests;
