use serde_json::Value;

use crate::config::tree::ConfigTree;
use crate::kernel::constants::ARGS_KEY;

/// Parsed command-line arguments.
///
/// An argument containing `=` after its first character is a top-level
/// override; everything else is positional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub args: Vec<String>,
    pub overrides: Vec<(String, String)>,
}

impl CommandLine {
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Self::default();
        for arg in args {
            let arg = arg.into();
            match arg.find('=') {
                Some(index) if index > 0 => {
                    let (key, value) = arg.split_at(index);
                    parsed.overrides.push((key.to_string(), value[1..].to_string()));
                }
                _ => parsed.args.push(arg),
            }
        }
        parsed
    }

    /// The override for `key`, last one winning.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Write the positional list under `args` and each override as a
    /// top-level string key. Keys are literal, dots included.
    pub fn apply(&self, tree: &mut ConfigTree) {
        let root = tree.root_mut();
        root.insert(
            ARGS_KEY.to_string(),
            Value::Array(self.args.iter().cloned().map(Value::String).collect()),
        );
        for (key, value) in &self.overrides {
            root.insert(key.clone(), Value::String(value.clone()));
        }
    }
}
