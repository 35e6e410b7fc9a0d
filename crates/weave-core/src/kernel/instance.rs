use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ConfigTree;
use crate::event::{EventBus, EventData, LOG, LogCategory, LogRecord, START};
use crate::feature::{FeatureSet, LoadedFeature};
use crate::kernel::bootstrap::ComposeMode;
use crate::wiring::Bindings;

/// A composed, running program.
///
/// Holds only what steady-state dispatch needs: the config tree, the bus with
/// the pruned bindings, and the surviving features.
pub struct Kernel {
    generation: u64,
    mode: ComposeMode,
    config: ConfigTree,
    bus: EventBus,
    features: FeatureSet,
    bindings: Bindings,
    feature_sources: BTreeSet<PathBuf>,
    started: AtomicBool,
    exited: AtomicBool,
}

impl Kernel {
    pub(crate) fn new(
        generation: u64,
        mode: ComposeMode,
        config: ConfigTree,
        bus: EventBus,
        features: FeatureSet,
        bindings: Bindings,
        feature_sources: BTreeSet<PathBuf>,
    ) -> Self {
        Self {
            generation,
            mode,
            config,
            bus,
            features,
            bindings,
            feature_sources,
            started: AtomicBool::new(false),
            exited: AtomicBool::new(false),
        }
    }

    /// Sequence number of the compose pass that built this kernel.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mode(&self) -> ComposeMode {
        self.mode
    }

    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&LoadedFeature> {
        self.features.get(name)
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Source paths of the modules this kernel loaded.
    pub fn feature_sources(&self) -> &BTreeSet<PathBuf> {
        &self.feature_sources
    }

    pub fn publish(&self, interface: &str, data: &EventData) -> usize {
        self.bus.publish(interface, data)
    }

    /// Raise a `log` event on this kernel's bus.
    pub fn log(&self, category: LogCategory, message: impl Into<String>) {
        let record = LogRecord::new(category, message);
        log::trace!("{}: {}", record.category, record.message);
        self.bus.publish(LOG, &record.to_data());
    }

    /// Raise `start`. Only cold-start kernels start, and only once.
    pub fn start(&self) -> bool {
        if self.mode != ComposeMode::ColdStart || self.started.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.log(LogCategory::Log, "Program is ready, starting program.");
        self.bus.publish(START, &EventData::Null);
        true
    }

    pub fn is_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Run every feature's `exit` hook. Only the first call does anything.
    pub fn exit_features(&self) -> bool {
        if self.exited.swap(true, Ordering::SeqCst) {
            return false;
        }
        for loaded in self.features.iter() {
            log::debug!("Exiting feature {}", loaded.name());
            loaded.feature.exit();
        }
        true
    }

    /// Hand over to `replacement`: detach this kernel's listeners, forward
    /// every interface it ever served to the replacement's bus, and release
    /// this kernel's features. Returns the number of forwarded interfaces.
    pub fn retire_into(&self, replacement: &Kernel) -> usize {
        let forwarded = self.bus.redirect_to(&replacement.bus);
        self.exit_features();
        forwarded
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("generation", &self.generation)
            .field("mode", &self.mode)
            .field("features", &self.features.names())
            .field("bus", &self.bus)
            .field("exited", &self.is_exited())
            .finish()
    }
}
