use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::config::ConfigTree;
use crate::config::error::ConfigError;
use crate::event::{EventData, LogCategory, StartupQueue};
use crate::feature::translation::TranslationTable;
use crate::runtime::RuntimeHandle;

/// What a module sees while it is being instantiated.
///
/// Nothing is wired yet, so everything raised here lands in the startup
/// queue and is delivered after wiring, before `start`.
pub struct ModuleContext<'a> {
    module: &'a str,
    config_root: &'a Path,
    config: &'a mut ConfigTree,
    translation: &'a TranslationTable,
    queue: &'a mut StartupQueue,
    runtime: Option<&'a RuntimeHandle>,
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        module: &'a str,
        config_root: &'a Path,
        config: &'a mut ConfigTree,
        translation: &'a TranslationTable,
        queue: &'a mut StartupQueue,
        runtime: Option<&'a RuntimeHandle>,
    ) -> Self {
        Self {
            module,
            config_root,
            config,
            translation,
            queue,
            runtime,
        }
    }

    /// Name under which the module is listed in `dependencies`.
    pub fn module(&self) -> &str {
        self.module
    }

    /// Directory holding the selectable config fragment directories.
    pub fn config_root(&self) -> &Path {
        self.config_root
    }

    pub fn config(&self) -> &ConfigTree {
        self.config
    }

    /// Populate a missing config key with `value`; returns the stored value.
    pub fn config_default<T: Serialize>(&mut self, path: &str, value: T) -> Result<Value, ConfigError> {
        self.config.ensure_default(path, value)
    }

    /// Resolve one of the module's own interface names through its
    /// translation table.
    pub fn translate(&mut self, name: &str) -> String {
        self.translation.translate(name, self.queue)
    }

    /// Raise an event; it is delivered once the program is wired.
    pub fn raise(&mut self, interface: impl Into<String>, data: EventData) {
        self.queue.enqueue(interface, data);
    }

    pub fn log(&mut self, category: LogCategory, message: impl Into<String>) {
        self.queue.log(category, message);
    }

    /// Handle to the process-wide runtime, when composing under one.
    pub fn runtime(&self) -> Option<&RuntimeHandle> {
        self.runtime
    }
}
