use std::any::{Any, type_name};
use std::fmt;

use crate::reload::error::ReloadError;

/// Opaque per-feature state carried across a reload.
///
/// Only the feature that produced a blob knows its concrete type. An empty
/// blob means "no prior state".
#[derive(Default)]
pub struct StateBlob {
    inner: Option<Box<dyn Any + Send>>,
}

impl StateBlob {
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn new<T: Any + Send>(state: T) -> Self {
        Self {
            inner: Some(Box::new(state)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Unpack the blob as `T`.
    ///
    /// `Ok(None)` for an empty blob; [`ReloadError::StateTransfer`] when the
    /// blob holds some other type.
    pub fn take<T: Any + Send>(self, feature: &str) -> Result<Option<T>, ReloadError> {
        match self.inner {
            None => Ok(None),
            Some(boxed) => boxed
                .downcast::<T>()
                .map(|state| Some(*state))
                .map_err(|_| ReloadError::StateTransfer {
                    feature: feature.to_string(),
                    expected: type_name::<T>().to_string(),
                }),
        }
    }
}

impl fmt::Debug for StateBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBlob")
            .field("empty", &self.is_empty())
            .finish()
    }
}
