use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::error::ConfigError;
use crate::kernel::constants::{ARGS_KEY, CONFIG_SELECT_KEY, DEPENDENCIES_KEY};

/// Merged configuration for one kernel instance.
///
/// Keys are addressed with dot paths (`logger.screen.WARN`). Insertion order
/// is preserved, which keeps `dependencies` in the order it was written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Map<String, Value>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ConfigError::invalid(
                "<root>",
                format!("expected an object, found {}", type_name(&other)),
            )),
        }
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Raw value at `path`.
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Typed value at `path`. `None` if missing or of the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get_value(path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Typed value at `path`, or `default` if missing or of the wrong shape.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get_value(path).is_some()
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    pub fn set<T: Serialize>(&mut self, path: &str, value: T) -> Result<(), ConfigError> {
        let value = serde_json::to_value(value)?;
        let (parent, key) = self.parent_mut(path)?;
        parent.insert(key, value);
        Ok(())
    }

    /// Populate `path` with `value` unless something is already there.
    /// Returns the value now stored at `path`.
    pub fn ensure_default<T: Serialize>(&mut self, path: &str, value: T) -> Result<Value, ConfigError> {
        if let Some(existing) = self.get_value(path) {
            return Ok(existing.clone());
        }
        let value = serde_json::to_value(value)?;
        self.set(path, value.clone())?;
        Ok(value)
    }

    /// Remove the value at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.root.remove(path),
            Some((parent, key)) => {
                let mut segments = parent.split('.');
                let mut current = self.root.get_mut(segments.next()?)?;
                for segment in segments {
                    current = current.as_object_mut()?.get_mut(segment)?;
                }
                current.as_object_mut()?.remove(key)
            }
        }
    }

    /// Positional command-line arguments.
    pub fn args(&self) -> Vec<String> {
        self.get(ARGS_KEY).unwrap_or_default()
    }

    /// Name of the selected fragment directory, from `config=<name>`.
    pub fn config_name(&self) -> Option<String> {
        match self.root.get(CONFIG_SELECT_KEY) {
            Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
            _ => None,
        }
    }

    /// Module names under `dependencies`, with their raw translation values,
    /// in declaration order.
    pub fn dependencies(&self) -> Result<Vec<(String, Value)>, ConfigError> {
        match self.root.get(DEPENDENCIES_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Object(entries)) => Ok(entries
                .iter()
                .map(|(name, table)| (name.clone(), table.clone()))
                .collect()),
            Some(other) => Err(ConfigError::invalid(
                DEPENDENCIES_KEY,
                format!("expected an object of module names, found {}", type_name(other)),
            )),
        }
    }

    fn parent_mut(&mut self, path: &str) -> Result<(&mut Map<String, Value>, String), ConfigError> {
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(ConfigError::invalid(path, "empty path segment"));
        }
        let mut segments: Vec<&str> = path.split('.').collect();
        let key = segments.pop().unwrap_or_default().to_string();
        let mut current = &mut self.root;
        let mut walked = String::new();
        for segment in segments {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                other => {
                    return Err(ConfigError::invalid(
                        walked,
                        format!("cannot nest keys under {}", type_name(other)),
                    ));
                }
            };
        }
        Ok((current, key))
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
