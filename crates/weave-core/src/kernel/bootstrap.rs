use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{CommandLine, ConfigTree};
use crate::event::queue::stdout_sink;
use crate::event::{EventBus, FallbackSink, LogCategory, StartupQueue};
use crate::feature::{FeatureCatalog, FeatureRegistry};
use crate::kernel::constants;
use crate::kernel::error::{ComposePhase, Result};
use crate::kernel::instance::Kernel;
use crate::runtime::RuntimeHandle;
use crate::wiring::{self, Bindings};

/// Why a compose pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    /// Process start: the kernel raises `start` once installed.
    ColdStart,
    /// Live rebuild: `start` is never raised again.
    Reload,
}

/// Inputs shared by every compose pass of one process.
#[derive(Clone)]
pub struct ComposeOptions {
    pub config_root: PathBuf,
    pub command_line: CommandLine,
    /// Receives the startup queue dump when nothing consumes `log`.
    pub fallback: FallbackSink,
}

impl ComposeOptions {
    pub fn new(config_root: impl Into<PathBuf>, command_line: CommandLine) -> Self {
        Self {
            config_root: config_root.into(),
            command_line,
            fallback: stdout_sink(),
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackSink) -> Self {
        self.fallback = fallback;
        self
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::new(constants::DEFAULT_CONFIG_ROOT, CommandLine::default())
    }
}

impl std::fmt::Debug for ComposeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposeOptions")
            .field("config_root", &self.config_root)
            .field("command_line", &self.command_line)
            .finish()
    }
}

/// Runs complete compose passes against a fixed catalog and options.
pub struct Composer {
    catalog: Arc<FeatureCatalog>,
    options: ComposeOptions,
    generation: AtomicU64,
}

impl Composer {
    pub fn new(catalog: Arc<FeatureCatalog>, options: ComposeOptions) -> Self {
        Self {
            catalog,
            options,
            generation: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    /// Build a ready kernel from scratch: parse, load, wire, prune, flush.
    ///
    /// On failure every feature instantiated by this pass gets its `exit`
    /// hook and nothing escapes.
    pub fn compose(&self, mode: ComposeMode, runtime: Option<&RuntimeHandle>) -> Result<Kernel> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("Composing {} generation {} ({:?})", constants::APP_NAME, generation, mode);

        let mut boot = Bootstrap::new(mode);
        match boot.assemble(&self.catalog, &self.options, runtime) {
            Ok(()) => {
                boot.clean();
                Ok(boot.finish(generation, &self.options.fallback))
            }
            Err(e) => {
                boot.abort();
                Err(e)
            }
        }
    }
}

/// Bootstrap-only state of one compose pass.
///
/// Consumed by [`Bootstrap::finish`], which hands the surviving pieces to a
/// [`Kernel`] and drops the registry, trace, translation tables and queue.
pub struct Bootstrap {
    mode: ComposeMode,
    config: ConfigTree,
    queue: StartupQueue,
    registry: FeatureRegistry,
    bus: EventBus,
    bindings: Bindings,
}

impl Bootstrap {
    pub fn new(mode: ComposeMode) -> Self {
        let mut queue = StartupQueue::new();
        queue.log(LogCategory::Log, format!("{} initialized.", constants::APP_NAME));
        Self {
            mode,
            config: ConfigTree::new(),
            queue,
            registry: FeatureRegistry::new(),
            bus: EventBus::new(),
            bindings: Bindings::new(),
        }
    }

    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    pub fn queue(&self) -> &StartupQueue {
        &self.queue
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    fn assemble(
        &mut self,
        catalog: &FeatureCatalog,
        options: &ComposeOptions,
        runtime: Option<&RuntimeHandle>,
    ) -> Result<()> {
        self.parse(&options.command_line)?;
        self.load_features(catalog, options, runtime)?;
        self.aggregate()
    }

    /// Write positional arguments and `key=value` overrides into the config.
    pub fn parse(&mut self, command_line: &CommandLine) -> Result<()> {
        self.queue.log(LogCategory::Log, "Parsing command line arguments.");
        command_line.apply(&mut self.config);
        Ok(())
    }

    /// Merge the selected fragments and register every listed module.
    pub fn load_features(
        &mut self,
        catalog: &FeatureCatalog,
        options: &ComposeOptions,
        runtime: Option<&RuntimeHandle>,
    ) -> Result<()> {
        self.queue.log(LogCategory::Log, "Loading features.");
        FeatureRegistry::load_config(&mut self.config, &options.config_root, &mut self.queue)
            .map_err(|e| e.in_phase(ComposePhase::LoadFeatures))?;
        // Command-line overrides win over fragments.
        options.command_line.apply(&mut self.config);
        self.registry
            .load_features(
                catalog,
                &mut self.config,
                &options.config_root,
                &mut self.queue,
                runtime,
            )
            .map_err(|e| e.in_phase(ComposePhase::LoadFeatures))
    }

    /// Bind handlers to the bus.
    pub fn aggregate(&mut self) -> Result<()> {
        let registry = &mut self.registry;
        self.bindings = wiring::wire(
            &registry.features,
            &registry.interfaces,
            &mut registry.trace,
            &self.bus,
            &mut self.queue,
        )
        .map_err(|e| e.in_phase(ComposePhase::Aggregate))?;
        Ok(())
    }

    /// Trace reachability and drop unreachable features.
    pub fn clean(&mut self) -> Vec<String> {
        let registry = &mut self.registry;
        wiring::prune(
            &mut registry.features,
            &mut registry.trace,
            &mut self.bindings,
            &self.bus,
            &mut self.queue,
        )
        .iter()
        .map(|f| f.name().to_string())
        .collect()
    }

    /// Flush the startup queue and become a running [`Kernel`].
    pub fn finish(mut self, generation: u64, fallback: &FallbackSink) -> Kernel {
        self.queue.log(
            LogCategory::Log,
            "Program assembled, emitting events queued during startup.",
        );
        let flushed = self.queue.flush(&self.bus, fallback);
        log::debug!("Flushed {} startup event(s)", flushed);
        Kernel::new(
            generation,
            self.mode,
            self.config,
            self.bus,
            self.registry.features,
            self.bindings,
            self.registry.sources,
        )
    }

    /// Give up on this pass, releasing every instantiated feature.
    pub fn abort(self) {
        for loaded in self.registry.features.iter() {
            loaded.feature.exit();
        }
        self.bus.unsubscribe_all();
    }
}
