//! # Weave Reload Errors
use std::path::PathBuf;

use thiserror::Error;

use crate::kernel::error::Error as KernelError;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Cannot watch '{}': {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State for feature '{feature}' is not a {expected}")]
    StateTransfer { feature: String, expected: String },

    #[error("Rebuild failed: {source}")]
    Rebuild {
        #[source]
        source: Box<KernelError>,
    },

    #[error("A reload is already in progress")]
    InProgress,

    #[error("The runtime has shut down")]
    RuntimeGone,

    #[error("No async runtime is available for file watching")]
    NoAsyncRuntime,
}
