//! # Weave Configuration
//!
//! The config tree is one JSON object assembled from fragment files under
//! `<config_root>/<name>/`, where `<name>` comes from `config=<name>` on the
//! command line. Command-line `key=value` pairs are written on top.
//!
//! Fragment layout:
//! - `config.<ext>` merges into the level of the directory holding it.
//! - `a.b.<ext>` nests one level per dot segment before the extension.
//! - a subdirectory `d/` nests its own fragments under key `d`.
//!
//! Assignment is shallow: a fragment key replaces whatever was there.
pub mod args;
pub mod error;
pub mod format;
pub mod loader;
pub mod tree;

pub use args::CommandLine;
pub use error::ConfigError;
pub use format::ConfigFormat;
pub use tree::ConfigTree;
