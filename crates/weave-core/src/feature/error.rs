//! # Weave Feature Load Errors
//!
//! Every variant here is fatal for the compose pass that raised it.
use thiserror::Error;

use crate::kernel::error::Error as KernelError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No feature module named '{module}' is registered")]
    ModuleNotFound { module: String },

    #[error("Feature module '{module}' has an invalid descriptor: {reason}")]
    InvalidDescriptor { module: String, reason: String },

    #[error("Feature '{name}' from module '{module}' is already loaded")]
    DuplicateFeature { name: String, module: String },

    #[error("Feature module '{module}' is registered more than once")]
    DuplicateModule { module: String },

    #[error("Feature module '{module}' failed to initialize: {source}")]
    ModuleInit {
        module: String,
        #[source]
        source: Box<KernelError>,
    },
}
