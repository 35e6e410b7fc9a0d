use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::feature::context::ModuleContext;
use crate::feature::error::LoadError;
use crate::feature::traits::Feature;
use crate::kernel::error::Result;
use crate::utils::fs::normalize;

/// Builds a feature instance for one compose pass.
pub type FeatureFactory = Arc<dyn Fn(&mut ModuleContext<'_>) -> Result<Arc<dyn Feature>> + Send + Sync>;

/// A named, instantiable feature module.
#[derive(Clone)]
pub struct FeatureModule {
    name: String,
    source: Option<PathBuf>,
    factory: FeatureFactory,
}

impl FeatureModule {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&mut ModuleContext<'_>) -> Result<Arc<dyn Feature>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source: None,
            factory: Arc::new(factory),
        }
    }

    /// Source file of the module. Changes to it trigger a reload when the
    /// `features` watch scope is enabled.
    pub fn with_source(mut self, path: impl AsRef<Path>) -> Self {
        self.source = Some(normalize(path));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn instantiate(&self, ctx: &mut ModuleContext<'_>) -> Result<Arc<dyn Feature>> {
        (self.factory)(ctx).map_err(|e| {
            LoadError::ModuleInit {
                module: self.name.clone(),
                source: Box::new(e),
            }
            .into()
        })
    }
}

impl fmt::Debug for FeatureModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureModule")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Every module the program could load, keyed by module name.
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    modules: BTreeMap<String, FeatureModule>,
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: FeatureModule) -> std::result::Result<(), LoadError> {
        if self.modules.contains_key(module.name()) {
            return Err(LoadError::DuplicateModule {
                module: module.name().to_string(),
            });
        }
        log::debug!("Registered feature module '{}'", module.name());
        self.modules.insert(module.name().to_string(), module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FeatureModule> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
