use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error during '{operation}' on config path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} fragment '{}': {details}", path.display())]
    Parse {
        path: PathBuf,
        format: String,
        details: String,
    },

    #[error("Invalid config structure at '{key}': {reason}")]
    InvalidStructure { key: String, reason: String },

    #[error("Config value serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ConfigError::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidStructure {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
