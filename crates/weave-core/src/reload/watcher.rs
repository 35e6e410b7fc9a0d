use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::reload::error::ReloadError;
use crate::utils::fs::{DirSnapshot, dir_snapshot, find_dirs};

/// Source locations the orchestrator can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WatchScope {
    Core,
    Config,
    Features,
}

impl WatchScope {
    pub const ALL: [WatchScope; 3] = [WatchScope::Core, WatchScope::Config, WatchScope::Features];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchScope::Core => "core",
            WatchScope::Config => "config",
            WatchScope::Features => "features",
        }
    }
}

impl fmt::Display for WatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a directory watch reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchNotice {
    /// Entries of `dir` were added, removed or modified.
    Changed {
        scope: WatchScope,
        dir: PathBuf,
        entries: Vec<PathBuf>,
    },
    /// `dir` vanished or became unreadable; the watch has stopped.
    Invalidated { scope: WatchScope, dir: PathBuf },
}

/// Receives notices from watch tasks.
pub type NoticeSink = Arc<dyn Fn(WatchNotice) + Send + Sync>;

/// A polling watch on one directory. Dropping it stops the task.
pub struct WatchHandle {
    scope: WatchScope,
    dir: PathBuf,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Snapshot `dir` now and poll it every `interval` on `runtime`.
    pub fn spawn(
        runtime: &Handle,
        scope: WatchScope,
        dir: &Path,
        interval: Duration,
        sink: NoticeSink,
    ) -> Result<Self, ReloadError> {
        let initial = dir_snapshot(dir).map_err(|source| ReloadError::Watch {
            path: dir.to_path_buf(),
            source,
        })?;
        let watched = dir.to_path_buf();
        let task = runtime.spawn(poll_dir(scope, watched.clone(), interval, initial, sink));
        log::trace!("Watching {} ({})", watched.display(), scope);
        Ok(Self {
            scope,
            dir: watched,
            task,
        })
    }

    pub fn scope(&self) -> WatchScope {
        self.scope
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("scope", &self.scope)
            .field("dir", &self.dir)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn poll_dir(
    scope: WatchScope,
    dir: PathBuf,
    interval: Duration,
    mut last: DirSnapshot,
    sink: NoticeSink,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match dir_snapshot(&dir) {
            Ok(current) => {
                if current != last {
                    let entries = changed_entries(&last, &current);
                    last = current;
                    sink(WatchNotice::Changed {
                        scope,
                        dir: dir.clone(),
                        entries,
                    });
                }
            }
            Err(_) => {
                sink(WatchNotice::Invalidated { scope, dir });
                return;
            }
        }
    }
}

/// Entries present in only one snapshot, or with differing timestamps.
fn changed_entries(before: &DirSnapshot, after: &DirSnapshot) -> Vec<PathBuf> {
    let mut changed: Vec<PathBuf> = after
        .iter()
        .filter(|(path, modified)| before.get(*path) != Some(*modified))
        .map(|(path, _)| path.clone())
        .collect();
    changed.extend(before.keys().filter(|p| !after.contains_key(*p)).cloned());
    changed.sort();
    changed
}

/// Watches grouped by scope, one per directory.
#[derive(Debug, Default)]
pub struct WatchSet {
    scopes: BTreeMap<WatchScope, ScopeWatches>,
}

#[derive(Debug)]
struct ScopeWatches {
    root: PathBuf,
    watches: BTreeMap<PathBuf, WatchHandle>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root directory watched for `scope`, if any.
    pub fn root(&self, scope: WatchScope) -> Option<&Path> {
        self.scopes.get(&scope).map(|s| s.root.as_path())
    }

    pub fn is_watching(&self, scope: WatchScope, dir: &Path) -> bool {
        self.scopes
            .get(&scope)
            .is_some_and(|s| s.watches.contains_key(dir))
    }

    pub fn dirs(&self, scope: WatchScope) -> Vec<PathBuf> {
        self.scopes
            .get(&scope)
            .map(|s| s.watches.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.scopes.values().map(|s| s.watches.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Watch `root` and every directory below it for `scope`.
    ///
    /// Directories already watched are left alone, so calling this again
    /// only picks up new subdirectories and drops watches on directories
    /// that no longer exist. Returns the number of watches created.
    pub fn watch_tree(
        &mut self,
        runtime: &Handle,
        scope: WatchScope,
        root: &Path,
        interval: Duration,
        sink: &NoticeSink,
    ) -> Result<usize, ReloadError> {
        if self.root(scope).is_some_and(|r| r != root) {
            self.close_scope(scope);
        }
        let dirs = find_dirs(root).map_err(|source| ReloadError::Watch {
            path: root.to_path_buf(),
            source,
        })?;
        if dirs.is_empty() {
            return Err(ReloadError::Watch {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        let entry = self.scopes.entry(scope).or_insert_with(|| ScopeWatches {
            root: root.to_path_buf(),
            watches: BTreeMap::new(),
        });
        entry.watches.retain(|dir, _| dir.is_dir());
        let mut created = 0;
        for dir in dirs {
            if entry.watches.contains_key(&dir) {
                continue;
            }
            let handle = WatchHandle::spawn(runtime, scope, &dir, interval, Arc::clone(sink))?;
            entry.watches.insert(dir, handle);
            created += 1;
        }
        Ok(created)
    }

    /// Stop watching one directory.
    pub fn remove(&mut self, scope: WatchScope, dir: &Path) -> bool {
        self.scopes
            .get_mut(&scope)
            .is_some_and(|s| s.watches.remove(dir).is_some())
    }

    /// Stop every watch of `scope`.
    pub fn close_scope(&mut self, scope: WatchScope) -> usize {
        self.scopes.remove(&scope).map_or(0, |s| s.watches.len())
    }

    /// Stop every watch. Returns how many were running.
    pub fn close_all(&mut self) -> usize {
        let closed = self.len();
        self.scopes.clear();
        closed
    }
}
