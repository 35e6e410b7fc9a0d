use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use weave_core::config::error::ConfigError;
use weave_core::event::LogCategory;
use weave_core::feature::ModuleContext;

/// Config key of the logger section.
pub const SETTINGS_KEY: &str = "logger";

/// Placeholder replaced by the startup time in file names.
pub const DEFAULT_TIMESTAMP_PLACEHOLDER: &str = "?timestamp";

/// `logger` config section as written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggerSettings {
    /// Text in file names replaced by the startup time.
    pub timestamp: String,
    /// Directory file names are relative to.
    pub directory: PathBuf,
    /// Category name to enabled flag for screen output.
    pub screen: BTreeMap<String, bool>,
    /// File name (possibly holding the placeholder) to its categories.
    #[serde(default)]
    pub files: BTreeMap<String, BTreeMap<String, bool>>,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            timestamp: DEFAULT_TIMESTAMP_PLACEHOLDER.to_string(),
            directory: PathBuf::from("."),
            screen: LogCategory::ALL
                .iter()
                .map(|c| (c.as_str().to_string(), true))
                .collect(),
            files: BTreeMap::new(),
        }
    }
}

impl LoggerSettings {
    /// Read the `logger` section, populating missing keys with defaults.
    pub fn from_context(ctx: &mut ModuleContext<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let key = |name: &str| format!("{}.{}", SETTINGS_KEY, name);
        ctx.config_default(&key("timestamp"), &defaults.timestamp)?;
        ctx.config_default(&key("directory"), &defaults.directory)?;
        ctx.config_default(&key("screen"), &defaults.screen)?;

        let section = ctx
            .config()
            .get_value(SETTINGS_KEY)
            .cloned()
            .unwrap_or_default();
        let settings: LoggerSettings = serde_json::from_value(section)
            .map_err(|e| ConfigError::invalid(SETTINGS_KEY, e.to_string()))?;

        for name in settings.unknown_categories() {
            ctx.log(
                LogCategory::Warn,
                format!("Logger setting names unknown category {}, ignoring it.", name),
            );
        }
        Ok(settings)
    }

    /// Categories written to the screen.
    pub fn screen_categories(&self) -> BTreeSet<LogCategory> {
        enabled(&self.screen)
    }

    /// Categories written to the file configured as `name`.
    pub fn file_categories(&self, name: &str) -> BTreeSet<LogCategory> {
        self.files.get(name).map(enabled).unwrap_or_default()
    }

    /// File path for `name`, with the placeholder replaced by `stamp`.
    pub fn file_path(&self, name: &str, stamp: &str) -> PathBuf {
        let resolved = if self.timestamp.is_empty() {
            name.to_string()
        } else {
            name.replace(&self.timestamp, stamp)
        };
        self.directory.join(resolved)
    }

    fn unknown_categories(&self) -> Vec<String> {
        self.screen
            .keys()
            .chain(self.files.values().flat_map(|m| m.keys()))
            .filter(|name| LogCategory::parse(name).is_none())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn enabled(flags: &BTreeMap<String, bool>) -> BTreeSet<LogCategory> {
    flags
        .iter()
        .filter(|(_, on)| **on)
        .filter_map(|(name, _)| LogCategory::parse(name))
        .collect()
}
