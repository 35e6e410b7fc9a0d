use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Entry name to modification time for the direct children of a directory.
pub type DirSnapshot = BTreeMap<PathBuf, Option<SystemTime>>;

/// Direct children of `dir`, sorted by file name.
pub fn sorted_entries<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        entries.push(entry?.path());
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

/// `root` and every directory below it, parents before children.
pub fn find_dirs<P: AsRef<Path>>(root: P) -> io::Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut result = Vec::new();
    if !root.is_dir() {
        return Ok(result);
    }
    result.push(root.to_path_buf());
    for entry in sorted_entries(root)? {
        if entry.is_dir() {
            result.append(&mut find_dirs(&entry)?);
        }
    }
    Ok(result)
}

/// Record the modification time of every direct child of `dir`.
///
/// Fails if `dir` itself cannot be read; unreadable children are recorded
/// without a timestamp.
pub fn dir_snapshot<P: AsRef<Path>>(dir: P) -> io::Result<DirSnapshot> {
    let mut snapshot = DirSnapshot::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let modified = entry.metadata().and_then(|m| m.modified()).ok();
        snapshot.insert(entry.path(), modified);
    }
    Ok(snapshot)
}

/// Absolute, canonical form of `path` when it exists; joined onto the
/// current directory otherwise.
pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
