use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::config::error::ConfigError;
use crate::config::format::ConfigFormat;
use crate::config::tree::{ConfigTree, type_name};
use crate::kernel::constants::ROOT_CONFIG_STEM;
use crate::utils::fs::sorted_entries;

/// Merge every fragment under `dir` into `tree`.
pub fn load_into(tree: &mut ConfigTree, dir: &Path) -> Result<(), ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "config directory not found"),
            "read config directory",
            dir,
        ));
    }
    merge_dir(dir, tree.root_mut(), "")
}

/// Read `dir`'s fragments into `target`: files first, then subdirectories.
fn merge_dir(dir: &Path, target: &mut Map<String, Value>, prefix: &str) -> Result<(), ConfigError> {
    let entries = sorted_entries(dir).map_err(|e| ConfigError::io(e, "read config directory", dir))?;

    let mut subdirs = Vec::new();
    for path in entries {
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }
        let Some(format) = ConfigFormat::from_path(&path) else {
            log::debug!("Skipping non-config file {}", path.display());
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let fragment = read_fragment(&path, format)?;
        let level_path: Vec<&str> = if stem == ROOT_CONFIG_STEM {
            Vec::new()
        } else {
            stem.split('.').collect()
        };
        log::trace!("Merging config fragment {}", path.display());
        let level = descend(target, &level_path, prefix)?;
        for (key, value) in fragment {
            level.insert(key, value);
        }
    }

    for subdir in subdirs {
        let Some(name) = subdir.file_name().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let nested_prefix = join_key(prefix, &name);
        let level = descend(target, &[name.as_str()], prefix)?;
        merge_dir(&subdir, level, &nested_prefix)?;
    }
    Ok(())
}

fn read_fragment(path: &Path, format: ConfigFormat) -> Result<Map<String, Value>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(e, "read config fragment", path))?;
    match format.parse(&text, path)? {
        Value::Object(map) => Ok(map),
        // An empty YAML document parses to null.
        Value::Null => Ok(Map::new()),
        other => Err(ConfigError::invalid(
            path.display().to_string(),
            format!("fragment must be an object, found {}", type_name(&other)),
        )),
    }
}

/// Walk (creating as needed) the object at `segments` below `target`.
fn descend<'a>(
    target: &'a mut Map<String, Value>,
    segments: &[&str],
    prefix: &str,
) -> Result<&'a mut Map<String, Value>, ConfigError> {
    let mut current = target;
    let mut key_path = prefix.to_string();
    for segment in segments {
        key_path = join_key(&key_path, segment);
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::invalid(
                    key_path,
                    format!("cannot merge a fragment into {}", type_name(other)),
                ));
            }
        };
    }
    Ok(current)
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
