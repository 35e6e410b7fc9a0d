//! # Weave Kernel Errors
//!
//! Defines the kernel-level [`Error`], which wraps the typed error of every
//! subsystem ([`ConfigError`], [`LoadError`], [`EventError`], [`ReloadError`])
//! and adds [`Error::Lifecycle`] for failures attributed to a compose phase.
//!
//! Only fatal conditions become an `Err`. Wiring conflicts, dangling
//! interfaces and transfer fallbacks are reported through the `log` interface.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::event::error::EventError;
use crate::feature::error::LoadError;
use crate::reload::error::ReloadError;

/// Kernel error type
#[derive(Debug, ThisError)]
pub enum Error {
    /// Configuration tree could not be assembled or read
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A feature module could not be loaded (fatal for the compose pass)
    #[error("Feature load error: {0}")]
    Load(#[from] LoadError),

    /// Event bus misuse or malformed event data
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Hot-reload failure (watch, state transfer or rebuild)
    #[error("Reload error: {0}")]
    Reload(#[from] ReloadError),

    /// Error occurring during a specific compose phase.
    #[error("Compose error during {phase}: {message}")]
    Lifecycle {
        phase: ComposePhase,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },
}

/// Phases of one compose pass that can fail. `parse`, `clean` and `finish`
/// report through the startup queue instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum ComposePhase {
    #[error("LoadFeatures")]
    LoadFeatures,
    #[error("Aggregate")]
    Aggregate,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    /// Wrap an error as having happened during `phase`.
    pub fn in_phase(self, phase: ComposePhase) -> Self {
        match self {
            Error::Lifecycle { .. } => self,
            other => Error::Lifecycle {
                phase,
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// The compose phase this error was attributed to, if any.
    pub fn phase(&self) -> Option<ComposePhase> {
        match self {
            Error::Lifecycle { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
