use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::event::Handler;
use crate::feature::error::LoadError;
use crate::feature::translation::TranslationTable;

/// Which optional state-transfer hooks a feature provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub save: bool,
    pub load: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        save: false,
        load: false,
    };

    pub const STATEFUL: Capabilities = Capabilities {
        save: true,
        load: true,
    };
}

/// What a feature declares to the kernel.
///
/// `implements` and `monitors` map interface names to handlers; `emits` lists
/// the interfaces the feature may raise.
#[derive(Clone, Default)]
pub struct FeatureDescriptor {
    pub name: String,
    pub implements: BTreeMap<String, Handler>,
    pub monitors: BTreeMap<String, Handler>,
    pub emits: BTreeSet<String>,
}

impl FeatureDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn implement(mut self, interface: impl Into<String>, handler: Handler) -> Self {
        self.implements.insert(interface.into(), handler);
        self
    }

    pub fn monitor(mut self, interface: impl Into<String>, handler: Handler) -> Self {
        self.monitors.insert(interface.into(), handler);
        self
    }

    pub fn emit(mut self, interface: impl Into<String>) -> Self {
        self.emits.insert(interface.into());
        self
    }

    /// Check required fields. `module` names the module in the error.
    pub fn validate(&self, module: &str) -> Result<(), LoadError> {
        let invalid = |reason: String| LoadError::InvalidDescriptor {
            module: module.to_string(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("feature name is empty".to_string()));
        }
        let declared = self
            .implements
            .keys()
            .map(|k| ("implements", k))
            .chain(self.monitors.keys().map(|k| ("monitors", k)))
            .chain(self.emits.iter().map(|k| ("emits", k)));
        for (role, interface) in declared {
            if interface.trim().is_empty() {
                return Err(invalid(format!(
                    "feature '{}' {} an interface with an empty name",
                    self.name, role
                )));
            }
        }
        Ok(())
    }

    /// Copy with every interface name rewritten through `table`.
    pub fn translated(&self, table: &TranslationTable) -> Self {
        Self {
            name: self.name.clone(),
            implements: table.translate_keys(&self.implements),
            monitors: table.translate_keys(&self.monitors),
            emits: self.emits.iter().map(|i| table.resolve(i).to_string()).collect(),
        }
    }
}

impl fmt::Debug for FeatureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureDescriptor")
            .field("name", &self.name)
            .field("implements", &self.implements.keys().collect::<Vec<_>>())
            .field("monitors", &self.monitors.keys().collect::<Vec<_>>())
            .field("emits", &self.emits)
            .finish()
    }
}
