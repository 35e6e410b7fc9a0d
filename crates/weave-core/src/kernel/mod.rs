//! # Weave Kernel
//!
//! The `kernel` module drives one compose pass: command-line parsing, config
//! loading, feature registration, wiring, pruning and the startup-queue flush.
//!
//! A pass runs in two one-way stages:
//!
//! - **Bootstrapping** ([`Bootstrap`](bootstrap::Bootstrap)): owns the feature
//!   registry, interface registry, trace, translation tables and startup queue.
//! - **Running** ([`Kernel`](instance::Kernel)): owns only the config tree, the
//!   event bus with the pruned bindings, and the surviving features.
//!
//! [`Composer`](bootstrap::Composer) runs the full pipeline and hands back a
//! `Kernel`; everything bootstrap-only is dropped on the way out.
pub mod bootstrap;
pub mod constants;
pub mod error;
pub mod instance;

pub use bootstrap::{Bootstrap, ComposeMode, ComposeOptions, Composer};
pub use error::{ComposePhase, Error, Result};
pub use instance::Kernel;
