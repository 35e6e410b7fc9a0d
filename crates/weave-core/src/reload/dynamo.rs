use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::event::{LOG, LogCategory, START, handler};
use crate::feature::{Capabilities, Feature, FeatureDescriptor, FeatureModule, ModuleContext, StateBlob};
use crate::kernel::constants::DYNAMO_KEY;
use crate::kernel::error::Result;
use crate::reload::error::ReloadError;
use crate::reload::scheduler::{ReloadScheduler, ReloadTarget};
use crate::reload::watcher::{NoticeSink, WatchNotice, WatchScope, WatchSet};
use crate::utils::fs::normalize;

/// Module name used under `dependencies`.
pub const MODULE_NAME: &str = "dynamo";
/// Feature name of the orchestrator.
pub const FEATURE_NAME: &str = "weave.dynamo";

/// `dynamo` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoSettings {
    pub core: bool,
    pub config: bool,
    pub features: bool,
    /// Debounce delay.
    pub delay: Duration,
    /// How often each watched directory is polled.
    pub poll_interval: Duration,
    pub core_path: PathBuf,
    /// The selected configuration directory, or the whole config root when
    /// none is selected.
    pub config_path: PathBuf,
    pub features_path: PathBuf,
}

impl Default for DynamoSettings {
    fn default() -> Self {
        Self {
            core: false,
            config: false,
            features: false,
            delay: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(500),
            core_path: PathBuf::from("core"),
            config_path: PathBuf::from(crate::kernel::constants::DEFAULT_CONFIG_ROOT),
            features_path: PathBuf::from("features"),
        }
    }
}

impl DynamoSettings {
    /// Read the `dynamo` section, writing defaults for missing keys.
    pub fn from_context(ctx: &mut ModuleContext<'_>) -> Result<Self> {
        let defaults = Self::default();
        let key = |name: &str| format!("{}.{}", DYNAMO_KEY, name);
        ctx.config_default(&key("core"), defaults.core)?;
        ctx.config_default(&key("config"), defaults.config)?;
        ctx.config_default(&key("features"), defaults.features)?;
        ctx.config_default(&key("delay"), defaults.delay.as_millis() as u64)?;
        ctx.config_default(&key("poll_interval"), defaults.poll_interval.as_millis() as u64)?;
        ctx.config_default(&key("core_path"), defaults.core_path.to_string_lossy())?;
        ctx.config_default(&key("features_path"), defaults.features_path.to_string_lossy())?;
        let selected = match ctx.config().config_name() {
            Some(name) => ctx.config_root().join(name),
            None => ctx.config_root().to_path_buf(),
        };
        ctx.config_default(&key("config_path"), selected.to_string_lossy())?;

        let config = ctx.config();
        Ok(Self {
            core: config.get_or(&key("core"), defaults.core),
            config: config.get_or(&key("config"), defaults.config),
            features: config.get_or(&key("features"), defaults.features),
            delay: Duration::from_millis(config.get_or(&key("delay"), 5000u64)),
            poll_interval: Duration::from_millis(config.get_or(&key("poll_interval"), 500u64).max(1)),
            core_path: normalize(config.get_or(&key("core_path"), defaults.core_path)),
            config_path: normalize(config.get_or(&key("config_path"), selected)),
            features_path: normalize(config.get_or(&key("features_path"), defaults.features_path)),
        })
    }

    pub fn enabled(&self, scope: WatchScope) -> bool {
        match scope {
            WatchScope::Core => self.core,
            WatchScope::Config => self.config,
            WatchScope::Features => self.features,
        }
    }

    pub fn any_enabled(&self) -> bool {
        WatchScope::ALL.iter().any(|s| self.enabled(*s))
    }

    pub fn path(&self, scope: WatchScope) -> &Path {
        match scope {
            WatchScope::Core => &self.core_path,
            WatchScope::Config => &self.config_path,
            WatchScope::Features => &self.features_path,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Watches plus debounce scheduler. Outlives individual kernels by riding
/// through the dynamo feature's `save`/`load`.
pub struct Orchestrator {
    scheduler: Arc<ReloadScheduler>,
    runtime: Handle,
    settings: Mutex<DynamoSettings>,
    watches: Mutex<WatchSet>,
}

impl Orchestrator {
    pub fn new(target: Arc<dyn ReloadTarget>, settings: DynamoSettings, runtime: Handle) -> Arc<Self> {
        let scheduler = ReloadScheduler::new(target, settings.delay, runtime.clone());
        Arc::new(Self {
            scheduler,
            runtime,
            settings: Mutex::new(settings),
            watches: Mutex::new(WatchSet::new()),
        })
    }

    pub fn scheduler(&self) -> &Arc<ReloadScheduler> {
        &self.scheduler
    }

    pub fn settings(&self) -> DynamoSettings {
        lock(&self.settings).clone()
    }

    pub fn watched_dirs(&self, scope: WatchScope) -> Vec<PathBuf> {
        lock(&self.watches).dirs(scope)
    }

    pub fn watch_count(&self) -> usize {
        lock(&self.watches).len()
    }

    fn sink(self: &Arc<Self>) -> NoticeSink {
        let weak = Arc::downgrade(self);
        Arc::new(move |notice: WatchNotice| {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.on_notice(notice);
            }
        })
    }

    /// Bring the watch set in line with the settings: keep watches on
    /// directories that still exist, add new ones, close disabled scopes.
    pub fn sync_watches(self: &Arc<Self>) {
        let settings = self.settings();
        let sink = self.sink();
        let mut failures = Vec::new();
        {
            let mut watches = lock(&self.watches);
            for scope in WatchScope::ALL {
                if !settings.enabled(scope) {
                    watches.close_scope(scope);
                    continue;
                }
                let root = settings.path(scope);
                match watches.watch_tree(&self.runtime, scope, root, settings.poll_interval, &sink) {
                    Ok(created) if created > 0 => {
                        log::debug!("Created {} watch(es) for {} scope", created, scope);
                    }
                    Ok(_) => {}
                    Err(e) => failures.push(e),
                }
            }
        }
        for e in failures {
            self.log(LogCategory::Error, &e.to_string());
        }
    }

    /// Take over after a reload with the new kernel's settings.
    pub fn adopt(self: &Arc<Self>, settings: DynamoSettings) {
        self.scheduler.set_delay(settings.delay);
        *lock(&self.settings) = settings;
        self.sync_watches();
    }

    fn log(&self, category: LogCategory, message: &str) {
        self.scheduler.target().log(category, message);
    }

    fn on_notice(self: &Arc<Self>, notice: WatchNotice) {
        match notice {
            WatchNotice::Invalidated { scope, dir } => {
                lock(&self.watches).remove(scope, &dir);
                self.log(
                    LogCategory::Log,
                    &format!("File watcher for {} is no longer valid, removing.", dir.display()),
                );
            }
            WatchNotice::Changed { scope, dir, entries } => {
                let new_dirs = {
                    let watches = lock(&self.watches);
                    entries
                        .iter()
                        .any(|e| e.is_dir() && !watches.is_watching(scope, e))
                };
                if new_dirs {
                    self.sync_watches();
                }
                if scope == WatchScope::Features {
                    let sources: BTreeSet<PathBuf> = self.scheduler.target().feature_sources();
                    if !entries.iter().any(|e| sources.contains(e)) {
                        log::debug!("Ignoring change in {}: no loaded feature affected", dir.display());
                        return;
                    }
                }
                self.log(
                    LogCategory::Fine,
                    &format!("Change detected in {} ({}), reload scheduled.", dir.display(), scope),
                );
                self.scheduler.schedule();
            }
        }
    }

    /// Stop every watch and the scheduler. Returns the number of watches closed.
    pub fn close(&self) -> usize {
        self.scheduler.cancel();
        lock(&self.watches).close_all()
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("scheduler", &self.scheduler)
            .field("watches", &self.watch_count())
            .finish()
    }
}

struct DynamoInner {
    settings: DynamoSettings,
    target: Option<Arc<dyn ReloadTarget>>,
    slot: Mutex<Option<Arc<Orchestrator>>>,
}

impl DynamoInner {
    fn report(&self, category: LogCategory, message: &str) {
        match &self.target {
            Some(target) => target.log(category, message),
            None => log::log!(category.level(), "{}", message),
        }
    }

    /// Start watching from scratch, unless already running.
    fn main(&self) {
        if lock(&self.slot).is_some() {
            return;
        }
        if !self.settings.any_enabled() {
            log::debug!("Live reloading disabled");
            return;
        }
        let Some(target) = self.target.clone() else {
            self.report(LogCategory::Warn, "No runtime to reload, live reloading disabled.");
            return;
        };
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.report(LogCategory::Error, &ReloadError::NoAsyncRuntime.to_string());
                return;
            }
        };
        let orchestrator = Orchestrator::new(target, self.settings.clone(), runtime);
        orchestrator.sync_watches();
        let scopes: Vec<&str> = WatchScope::ALL
            .iter()
            .filter(|s| self.settings.enabled(**s))
            .map(|s| s.as_str())
            .collect();
        self.report(
            LogCategory::Log,
            &format!("Watching {} for changes.", scopes.join(", ")),
        );
        *lock(&self.slot) = Some(orchestrator);
    }
}

/// Feature owning the hot-reload orchestrator.
pub struct DynamoFeature {
    inner: Arc<DynamoInner>,
}

impl DynamoFeature {
    pub fn new(settings: DynamoSettings, target: Option<Arc<dyn ReloadTarget>>) -> Self {
        Self {
            inner: Arc::new(DynamoInner {
                settings,
                target,
                slot: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &DynamoSettings {
        &self.inner.settings
    }

    /// The running orchestrator, if watching.
    pub fn orchestrator(&self) -> Option<Arc<Orchestrator>> {
        lock(&self.inner.slot).clone()
    }
}

impl Feature for DynamoFeature {
    fn descriptor(&self) -> FeatureDescriptor {
        let inner = Arc::clone(&self.inner);
        FeatureDescriptor::new(FEATURE_NAME)
            .monitor(START, handler(move |_, _| inner.main()))
            .emit(LOG)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STATEFUL
    }

    fn save(&self) -> Result<StateBlob> {
        Ok(match lock(&self.inner.slot).take() {
            Some(orchestrator) => StateBlob::new(orchestrator),
            None => StateBlob::empty(),
        })
    }

    fn load(&self, state: StateBlob) -> Result<()> {
        match state.take::<Arc<Orchestrator>>(FEATURE_NAME)? {
            Some(orchestrator) if self.inner.settings.any_enabled() => {
                orchestrator.adopt(self.inner.settings.clone());
                *lock(&self.inner.slot) = Some(orchestrator);
            }
            Some(orchestrator) => {
                let closed = orchestrator.close();
                self.inner.report(
                    LogCategory::Log,
                    &format!("Live reloading disabled, released {} watch(es).", closed),
                );
            }
            None => self.inner.main(),
        }
        Ok(())
    }

    fn exit(&self) {
        if let Some(orchestrator) = lock(&self.inner.slot).take() {
            let closed = orchestrator.close();
            log::debug!("Released {} watch(es)", closed);
        }
    }
}

/// The `dynamo` feature module.
pub fn module() -> FeatureModule {
    FeatureModule::new(MODULE_NAME, |ctx: &mut ModuleContext<'_>| {
        let settings = DynamoSettings::from_context(ctx)?;
        let target = ctx
            .runtime()
            .cloned()
            .map(|handle| Arc::new(handle) as Arc<dyn ReloadTarget>);
        ctx.log(
            LogCategory::Fine,
            format!(
                "Live reload settings: core={}, config={}, features={}, delay={}ms",
                settings.core,
                settings.config,
                settings.features,
                settings.delay.as_millis()
            ),
        );
        Ok(Arc::new(DynamoFeature::new(settings, target)) as Arc<dyn Feature>)
    })
}
