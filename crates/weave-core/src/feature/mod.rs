//! # Weave Feature System
//!
//! A feature is a module plugged into the kernel through a small contract:
//! a [`FeatureDescriptor`] naming the interfaces it implements, monitors and
//! emits, plus optional `save`/`load` hooks for carrying state across a
//! reload.
//!
//! Modules are registered by name in a [`FeatureCatalog`]. During a compose
//! pass the [`FeatureRegistry`](registry::FeatureRegistry) instantiates every
//! module listed under `dependencies`, rewrites its descriptor through the
//! module's [`TranslationTable`](translation::TranslationTable) and records
//! it in the interface registry.
pub mod catalog;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod state;
pub mod traits;
pub mod translation;

pub use catalog::{FeatureCatalog, FeatureFactory, FeatureModule};
pub use context::ModuleContext;
pub use descriptor::{Capabilities, FeatureDescriptor};
pub use error::LoadError;
pub use registry::{FeatureRegistry, FeatureSet, InterfaceRegistry, LoadedFeature};
pub use state::StateBlob;
pub use traits::Feature;
pub use translation::TranslationTable;
