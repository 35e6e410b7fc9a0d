use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ConfigTree;
use crate::config::loader;
use crate::event::{LogCategory, ROOT_INTERFACES, StartupQueue};
use crate::feature::catalog::{FeatureCatalog, FeatureModule};
use crate::feature::context::ModuleContext;
use crate::feature::descriptor::FeatureDescriptor;
use crate::feature::error::LoadError;
use crate::feature::traits::Feature;
use crate::feature::translation::TranslationTable;
use crate::kernel::error::Result;
use crate::runtime::RuntimeHandle;
use crate::wiring::trace::Trace;

/// Interface bookkeeping for one compose pass.
#[derive(Debug, Clone)]
pub struct InterfaceRegistry {
    /// Every interface that can be raised: the roots plus all `emits`.
    pub interfaces: BTreeSet<String>,
    /// Interface to the one feature implementing it.
    pub implementations: BTreeMap<String, String>,
    /// Feature to the interfaces it monitors.
    pub monitors: BTreeMap<String, Vec<String>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self {
            interfaces: ROOT_INTERFACES.iter().map(|i| i.to_string()).collect(),
            implementations: BTreeMap::new(),
            monitors: BTreeMap::new(),
        }
    }

    /// Whether any feature monitors `interface`.
    pub fn is_monitored(&self, interface: &str) -> bool {
        self.monitors
            .values()
            .any(|interfaces| interfaces.iter().any(|i| i == interface))
    }

    pub fn implementer(&self, interface: &str) -> Option<&str> {
        self.implementations.get(interface).map(String::as_str)
    }
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A feature instance with its translated descriptor.
#[derive(Clone)]
pub struct LoadedFeature {
    pub module: String,
    pub source: Option<PathBuf>,
    pub feature: Arc<dyn Feature>,
    pub descriptor: FeatureDescriptor,
}

impl LoadedFeature {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

impl fmt::Debug for LoadedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFeature")
            .field("module", &self.module)
            .field("source", &self.source)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Loaded features in load order.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<LoadedFeature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&LoadedFeature> {
        self.features.iter().find(|f| f.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedFeature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub(crate) fn push(&mut self, feature: LoadedFeature) {
        self.features.push(feature);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<LoadedFeature> {
        let index = self.features.iter().position(|f| f.name() == name)?;
        Some(self.features.remove(index))
    }
}

/// Registration state of one compose pass: the loaded features, the
/// interface registry and the trace under construction.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    pub features: FeatureSet,
    pub interfaces: InterfaceRegistry,
    pub trace: Trace,
    /// Source paths of every module loaded in this pass.
    pub sources: BTreeSet<PathBuf>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the selected fragment directory, if any, into `config`.
    pub fn load_config(config: &mut ConfigTree, config_root: &Path, queue: &mut StartupQueue) -> Result<()> {
        if let Some(name) = config.config_name() {
            queue.log(
                LogCategory::Log,
                format!("Loading specified configuration \"{}\".", name),
            );
            loader::load_into(config, &config_root.join(&name))?;
        }
        Ok(())
    }

    /// Instantiate and register every module listed under `dependencies`,
    /// in declaration order.
    pub fn load_features(
        &mut self,
        catalog: &FeatureCatalog,
        config: &mut ConfigTree,
        config_root: &Path,
        queue: &mut StartupQueue,
        runtime: Option<&RuntimeHandle>,
    ) -> Result<()> {
        for (module_name, raw_table) in config.dependencies()? {
            let module = catalog.get(&module_name).ok_or_else(|| LoadError::ModuleNotFound {
                module: module_name.clone(),
            })?;
            let table = TranslationTable::from_value(&module_name, &raw_table)?;
            let feature = {
                let mut ctx = ModuleContext::new(&module_name, config_root, config, &table, queue, runtime);
                module.instantiate(&mut ctx)?
            };
            if let Err(e) = self.register(module, Arc::clone(&feature), &table, queue) {
                feature.exit();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Validate, translate and record one feature instance.
    pub fn register(
        &mut self,
        module: &FeatureModule,
        feature: Arc<dyn Feature>,
        table: &TranslationTable,
        queue: &mut StartupQueue,
    ) -> Result<()> {
        let declared = feature.descriptor();
        declared.validate(module.name())?;
        if self.features.contains(&declared.name) {
            return Err(LoadError::DuplicateFeature {
                name: declared.name.clone(),
                module: module.name().to_string(),
            }
            .into());
        }
        let name = declared.name.clone();
        queue.log(LogCategory::Log, format!("Loading feature {}", name));
        // Descriptors use canonical names; the table is applied exactly once, here.
        let canonical: BTreeSet<&String> = declared
            .implements
            .keys()
            .chain(declared.monitors.keys())
            .chain(declared.emits.iter())
            .collect();
        for interface in canonical {
            table.translate(interface, queue);
        }
        let descriptor = declared.translated(table);

        for interface in descriptor.implements.keys() {
            match self.interfaces.implementations.get(interface) {
                Some(owner) => queue.log(
                    LogCategory::Warn,
                    format!(
                        "Feature {} implements interface {}, which is already implemented by {}.  Ignoring this mapping.",
                        name, interface, owner
                    ),
                ),
                None => {
                    self.interfaces
                        .implementations
                        .insert(interface.clone(), name.clone());
                }
            }
        }

        let emits: Vec<String> = descriptor.emits.iter().cloned().collect();
        self.interfaces.interfaces.extend(emits.iter().cloned());
        self.trace.add_feature(&name, emits);

        self.interfaces
            .monitors
            .insert(name.clone(), descriptor.monitors.keys().cloned().collect());

        if let Some(source) = module.source() {
            self.sources.insert(source.to_path_buf());
        }
        self.features.push(LoadedFeature {
            module: module.name().to_string(),
            source: module.source().map(Path::to_path_buf),
            feature,
            descriptor,
        });
        Ok(())
    }
}
