//! # Weave Runtime
//!
//! The process-wide slot holding the current [`Kernel`]. Exactly one kernel
//! is current at a time; [`Runtime::reload`] builds a replacement from
//! scratch and swaps it in only after the whole compose pipeline succeeds.
//!
//! Cutover order:
//! 1. `save()` on every current feature that declares it
//! 2. compose a new kernel (no `start`)
//! 3. swap the slot
//! 4. `load()` on every new feature that declares it, with its saved blob
//!    or an empty one
//! 5. redirect the old bus to the new one and exit the old features
//!
//! A failed compose hands the blobs back to the features that saved them.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::event::LogCategory;
use crate::feature::{FeatureCatalog, StateBlob};
use crate::kernel::bootstrap::{ComposeMode, ComposeOptions, Composer};
use crate::kernel::error::Result;
use crate::kernel::instance::Kernel;
use crate::reload::error::ReloadError;
use crate::reload::scheduler::ReloadTarget;

struct RuntimeInner {
    composer: Composer,
    current: Mutex<Option<Arc<Kernel>>>,
    reloading: AtomicBool,
    shut_down: AtomicBool,
}

impl RuntimeInner {
    fn current(&self) -> Option<Arc<Kernel>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, kernel: Arc<Kernel>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(kernel);
    }

    fn reload(self: &Arc<Self>) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ReloadError::RuntimeGone.into());
        }
        if self.reloading.swap(true, Ordering::SeqCst) {
            return Err(ReloadError::InProgress.into());
        }
        let result = self.rebuild();
        self.reloading.store(false, Ordering::SeqCst);
        result
    }

    fn rebuild(self: &Arc<Self>) -> Result<()> {
        let old = self.current().ok_or(ReloadError::RuntimeGone)?;
        old.log(LogCategory::Log, "Change detected, rebuilding program.");
        let blobs = save_states(&old);

        old.log(LogCategory::Log, "Compiling new program instance.");
        let handle = RuntimeHandle {
            inner: Arc::downgrade(self),
        };
        let replacement = match self.composer.compose(ComposeMode::Reload, Some(&handle)) {
            Ok(kernel) => Arc::new(kernel),
            Err(e) => {
                old.log(
                    LogCategory::Error,
                    format!("Rebuild failed, keeping the current program: {}", e),
                );
                restore_states(&old, blobs, Transfer::Rollback);
                return Err(ReloadError::Rebuild { source: Box::new(e) }.into());
            }
        };

        self.install(Arc::clone(&replacement));
        restore_states(&replacement, blobs, Transfer::Cutover);
        replacement.log(
            LogCategory::Log,
            "Redirecting pending events to the new program instance.",
        );
        let forwarded = old.retire_into(&replacement);
        log::info!(
            "Generation {} replaced generation {} ({} interface(s) forwarded)",
            replacement.generation(),
            old.generation(),
            forwarded
        );
        Ok(())
    }

    fn shutdown(&self) -> bool {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(kernel) = self.current() {
            log::info!("Shutting down generation {}", kernel.generation());
            kernel.exit_features();
        }
        true
    }
}

/// Collect blobs from every feature that can save.
fn save_states(kernel: &Kernel) -> BTreeMap<String, StateBlob> {
    let mut blobs = BTreeMap::new();
    for loaded in kernel.features().iter() {
        if !loaded.feature.capabilities().save {
            continue;
        }
        kernel.log(
            LogCategory::Log,
            format!("Saving existing state of feature {}.", loaded.name()),
        );
        match loaded.feature.save() {
            Ok(blob) => {
                blobs.insert(loaded.name().to_string(), blob);
            }
            Err(e) => kernel.log(
                LogCategory::Error,
                format!("Saving state of feature {} failed: {}", loaded.name(), e),
            ),
        }
    }
    blobs
}

/// Which side of a rebuild the saved blobs are handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    /// The replacement kernel: every loader gets its blob or an empty one.
    Cutover,
    /// The kernel that saved them: only features holding a blob are touched.
    Rollback,
}

/// Feed blobs to every feature that can load. A failed transfer falls back
/// to loading an empty blob.
fn restore_states(kernel: &Kernel, mut blobs: BTreeMap<String, StateBlob>, transfer: Transfer) {
    for loaded in kernel.features().iter() {
        if !loaded.feature.capabilities().load {
            continue;
        }
        let blob = match blobs.remove(loaded.name()) {
            Some(blob) => {
                kernel.log(
                    LogCategory::Log,
                    format!("Transferring saved state of feature {}.", loaded.name()),
                );
                blob
            }
            None if transfer == Transfer::Rollback => continue,
            None => StateBlob::empty(),
        };
        if let Err(e) = loaded.feature.load(blob) {
            kernel.log(
                LogCategory::Error,
                format!(
                    "State transfer for feature {} failed; initializing from scratch. ({})",
                    loaded.name(),
                    e
                ),
            );
            if let Err(e) = loaded.feature.load(StateBlob::empty()) {
                kernel.log(
                    LogCategory::Error,
                    format!("Feature {} could not initialize: {}", loaded.name(), e),
                );
            }
        }
    }
    for name in blobs.keys() {
        log::debug!("Discarding saved state of feature {} (not loaded)", name);
    }
}

/// Owner of the current kernel. Shuts the program down when dropped.
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Compose the first kernel, install it and raise `start`.
    pub fn start(catalog: Arc<FeatureCatalog>, options: ComposeOptions) -> Result<Self> {
        let inner = Arc::new(RuntimeInner {
            composer: Composer::new(catalog, options),
            current: Mutex::new(None),
            reloading: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        });
        let handle = RuntimeHandle {
            inner: Arc::downgrade(&inner),
        };
        let kernel = Arc::new(inner.composer.compose(ComposeMode::ColdStart, Some(&handle))?);
        inner.install(Arc::clone(&kernel));
        kernel.start();
        Ok(Self { inner })
    }

    pub fn current(&self) -> Option<Arc<Kernel>> {
        self.inner.current()
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Rebuild the program and cut over to it.
    pub fn reload(&self) -> Result<()> {
        self.inner.reload()
    }

    /// Run the current kernel's exit hooks. Only the first call does anything.
    pub fn shutdown(&self) -> bool {
        self.inner.shutdown()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("current", &self.current().map(|k| k.generation()))
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Non-owning handle to a [`Runtime`], given to features that need it.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| !inner.shut_down.load(Ordering::SeqCst))
    }

    pub fn current(&self) -> Option<Arc<Kernel>> {
        self.inner.upgrade().and_then(|inner| inner.current())
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl ReloadTarget for RuntimeHandle {
    fn reload(&self) -> Result<()> {
        match self.inner.upgrade() {
            Some(inner) => inner.reload(),
            None => Err(ReloadError::RuntimeGone.into()),
        }
    }

    fn log(&self, category: LogCategory, message: &str) {
        match self.current() {
            Some(kernel) => kernel.log(category, message),
            None => log::log!(category.level(), "{}", message),
        }
    }

    fn feature_sources(&self) -> BTreeSet<PathBuf> {
        self.current()
            .map(|kernel| kernel.feature_sources().clone())
            .unwrap_or_default()
    }
}
