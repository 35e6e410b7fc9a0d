//! # Weave Logger
//!
//! Bundled implementation of the `log` interface. Records arriving before
//! `start` are queued; once started they go to the screen (through the `log`
//! facade, target [`SCREEN_TARGET`]) and to any configured files.
//!
//! Open files survive a reload: `save` hands them to the next instance,
//! which keeps the ones still configured and closes the rest.
pub mod settings;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use weave_core::event::{handler, EventBus, EventData, LogCategory, LogRecord, LOG, START};
use weave_core::feature::{
    Capabilities, Feature, FeatureDescriptor, FeatureModule, ModuleContext, StateBlob,
};
use weave_core::kernel::error::Result as KernelResult;

pub use settings::LoggerSettings;

/// Module name used under `dependencies`.
pub const MODULE_NAME: &str = "logger";
/// Feature name of the logger.
pub const FEATURE_NAME: &str = "weave.logger";
/// Facade target of screen output.
pub const SCREEN_TARGET: &str = "weave";

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// One open log file.
struct LogFile {
    path: PathBuf,
    categories: BTreeSet<LogCategory>,
    writer: BufWriter<File>,
}

impl LogFile {
    fn open(path: PathBuf, categories: BTreeSet<LogCategory>) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            categories,
            writer: BufWriter::new(file),
        })
    }

    fn write(&mut self, record: &LogRecord) {
        if !self.categories.contains(&record.category) {
            return;
        }
        if let Err(e) = writeln!(self.writer, "{}", record).and_then(|_| self.writer.flush()) {
            log::error!("Failed writing to log file {}: {}", self.path.display(), e);
        }
    }

    fn close(mut self) {
        if let Err(e) = self.writer.flush() {
            log::error!("Failed closing log file {}: {}", self.path.display(), e);
        }
    }
}

/// Open files handed from one logger instance to the next, keyed by their
/// configured name.
struct OpenFiles(BTreeMap<String, LogFile>);

#[derive(Default)]
struct LoggerState {
    started: bool,
    queue: Vec<LogRecord>,
    files: BTreeMap<String, LogFile>,
}

/// The logger feature.
pub struct LoggerFeature {
    settings: LoggerSettings,
    screen: BTreeSet<LogCategory>,
    state: Arc<Mutex<LoggerState>>,
}

fn lock(state: &Mutex<LoggerState>) -> MutexGuard<'_, LoggerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LoggerFeature {
    pub fn new(settings: LoggerSettings) -> Self {
        Self {
            screen: settings.screen_categories(),
            settings,
            state: Arc::new(Mutex::new(LoggerState::default())),
        }
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    /// Whether `start` (or a state transfer) has switched output on.
    pub fn is_started(&self) -> bool {
        lock(&self.state).started
    }

    /// Records held back until start.
    pub fn queued(&self) -> usize {
        lock(&self.state).queue.len()
    }

    /// Paths of the files currently open.
    pub fn open_files(&self) -> Vec<PathBuf> {
        lock(&self.state)
            .files
            .values()
            .map(|f| f.path.clone())
            .collect()
    }

    /// Switch output on, keeping `previous` files that are still
    /// configured and opening the rest.
    fn activate(
        settings: &LoggerSettings,
        screen: &BTreeSet<LogCategory>,
        state: &mut LoggerState,
        mut previous: BTreeMap<String, LogFile>,
    ) {
        let stamp = Local::now().format(STAMP_FORMAT).to_string();
        for name in settings.files.keys() {
            if state.files.contains_key(name) {
                continue;
            }
            let categories = settings.file_categories(name);
            let file = match previous.remove(name) {
                Some(mut kept) => {
                    kept.categories = categories;
                    kept
                }
                None => match LogFile::open(settings.file_path(name, &stamp), categories) {
                    Ok(file) => file,
                    Err(e) => {
                        log::error!("Cannot open log file for {}: {}", name, e);
                        continue;
                    }
                },
            };
            state.files.insert(name.clone(), file);
        }
        for (name, file) in previous {
            log::debug!("Closing log file {} ({} no longer configured)", file.path.display(), name);
            file.close();
        }

        state.started = true;
        for record in std::mem::take(&mut state.queue) {
            emit(screen, &mut state.files, &record);
        }
    }
}

/// Write one record to every output that wants its category.
fn emit(screen: &BTreeSet<LogCategory>, files: &mut BTreeMap<String, LogFile>, record: &LogRecord) {
    if screen.contains(&record.category) {
        log::log!(target: SCREEN_TARGET, record.category.level(), "{}", record.message);
    }
    for file in files.values_mut() {
        file.write(record);
    }
}

impl Feature for LoggerFeature {
    fn descriptor(&self) -> FeatureDescriptor {
        let on_log = {
            let state = Arc::clone(&self.state);
            let screen = self.screen.clone();
            handler(move |_bus: &EventBus, data: &EventData| {
                let record = match LogRecord::from_data(data) {
                    Ok(record) => record,
                    Err(e) => {
                        log::warn!("Dropping malformed log event: {}", e);
                        return;
                    }
                };
                let mut state = lock(&state);
                if state.started {
                    let LoggerState { files, .. } = &mut *state;
                    emit(&screen, files, &record);
                } else {
                    state.queue.push(record);
                }
            })
        };
        let on_start = {
            let state = Arc::clone(&self.state);
            let settings = self.settings.clone();
            let screen = self.screen.clone();
            handler(move |_bus: &EventBus, _data: &EventData| {
                let mut state = lock(&state);
                if !state.started {
                    Self::activate(&settings, &screen, &mut state, BTreeMap::new());
                }
            })
        };
        FeatureDescriptor::new(FEATURE_NAME)
            .monitor(LOG, on_log)
            .monitor(START, on_start)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STATEFUL
    }

    fn save(&self) -> KernelResult<StateBlob> {
        let files = std::mem::take(&mut lock(&self.state).files);
        Ok(StateBlob::new(OpenFiles(files)))
    }

    fn load(&self, state: StateBlob) -> KernelResult<()> {
        let previous = state
            .take::<OpenFiles>(FEATURE_NAME)?
            .map(|OpenFiles(files)| files)
            .unwrap_or_default();
        let mut current = lock(&self.state);
        Self::activate(&self.settings, &self.screen, &mut current, previous);
        Ok(())
    }

    fn exit(&self) {
        let mut state = lock(&self.state);
        for (_, file) in std::mem::take(&mut state.files) {
            file.close();
        }
        // Whatever never made it out before start goes to the screen now.
        for record in std::mem::take(&mut state.queue) {
            emit(&self.screen, &mut BTreeMap::new(), &record);
        }
    }
}

/// The `logger` feature module.
pub fn module() -> FeatureModule {
    FeatureModule::new(MODULE_NAME, |ctx: &mut ModuleContext<'_>| {
        let settings = LoggerSettings::from_context(ctx)?;
        Ok(Arc::new(LoggerFeature::new(settings)) as Arc<dyn Feature>)
    })
    .with_source(source_path())
}

fn source_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/src/lib.rs"))
}
