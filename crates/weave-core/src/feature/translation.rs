use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::error::ConfigError;
use crate::config::tree::type_name;
use crate::event::{LogCategory, StartupQueue};
use crate::kernel::constants::DEPENDENCIES_KEY;

/// Per-module mapping from canonical interface names to substitutes.
///
/// Comes from the module's entry under `dependencies`, e.g.
/// `{ "request_render": "request_render_cache" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    entries: BTreeMap<String, String>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Read the table configured for `module`. `null` means no translations.
    pub fn from_value(module: &str, value: &Value) -> Result<Self, ConfigError> {
        let key = format!("{}.{}", DEPENDENCIES_KEY, module);
        let entries = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(entries) => entries,
            other => {
                return Err(ConfigError::invalid(
                    key,
                    format!("expected an object of interface names, found {}", type_name(other)),
                ));
            }
        };
        let mut table = Self::new();
        for (from, to) in entries {
            match to {
                Value::String(to) if !to.trim().is_empty() => {
                    table.entries.insert(from.clone(), to.clone());
                }
                other => {
                    return Err(ConfigError::invalid(
                        format!("{}.{}", key, from),
                        format!("expected a non-empty interface name, found {}", type_name(other)),
                    ));
                }
            }
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Substitute for `name`, or `name` itself.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Translate a single interface name, queueing a `LOG` event when a
    /// substitute is in use.
    pub fn translate(&self, name: &str, queue: &mut StartupQueue) -> String {
        match self.entries.get(name) {
            Some(alternate) => {
                queue.log(
                    LogCategory::Log,
                    format!(
                        "Translating default interface {} to alternate interface {}.",
                        name, alternate
                    ),
                );
                alternate.clone()
            }
            None => name.to_string(),
        }
    }

    /// Rewrite the keys of `map`, keeping values. When two keys translate to
    /// the same name the later key wins.
    pub fn translate_keys<V: Clone>(&self, map: &BTreeMap<String, V>) -> BTreeMap<String, V> {
        map.iter()
            .map(|(k, v)| (self.resolve(k).to_string(), v.clone()))
            .collect()
    }
}
