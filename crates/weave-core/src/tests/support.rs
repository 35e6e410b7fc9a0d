//! Test features and capture helpers shared by the unit and integration tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::event::{handler, EventBus, EventData, FallbackSink, LogRecord, LOG, START};
use crate::feature::{
    Capabilities, Feature, FeatureDescriptor, FeatureModule, ModuleContext, StateBlob,
};
use crate::kernel::error::Result;
use crate::reload::error::ReloadError;

pub type Calls = Arc<Mutex<Vec<String>>>;

pub fn calls() -> Calls {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(calls: &Calls) -> Vec<String> {
    calls.lock().unwrap().clone()
}

/// Fallback sink writing into a vector.
pub fn capture_sink() -> (FallbackSink, Calls) {
    let lines = calls();
    let sink_lines = Arc::clone(&lines);
    let sink: FallbackSink = Arc::new(move |line: &str| {
        sink_lines.lock().unwrap().push(line.to_string());
    });
    (sink, lines)
}

/// Feature whose handlers record `<feature>:<interface>` when called.
#[derive(Clone)]
pub struct Probe {
    pub name: String,
    pub implements: Vec<String>,
    pub monitors: Vec<String>,
    pub emits: Vec<String>,
    pub calls: Calls,
    pub exits: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new(name: &str, calls: &Calls) -> Self {
        Self {
            name: name.to_string(),
            implements: Vec::new(),
            monitors: Vec::new(),
            emits: Vec::new(),
            calls: Arc::clone(calls),
            exits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.implements.push(interface.to_string());
        self
    }

    pub fn monitors(mut self, interface: &str) -> Self {
        self.monitors.push(interface.to_string());
        self
    }

    pub fn emits(mut self, interface: &str) -> Self {
        self.emits.push(interface.to_string());
        self
    }

    pub fn exit_count(&self) -> usize {
        self.exits.load(Ordering::SeqCst)
    }

    /// Module `module_name` producing this probe.
    pub fn module(&self, module_name: &str) -> FeatureModule {
        let template = self.clone();
        FeatureModule::new(module_name, move |_ctx: &mut ModuleContext<'_>| {
            Ok(Arc::new(template.clone()) as Arc<dyn Feature>)
        })
    }

    fn recorder(&self, interface: &str) -> crate::event::Handler {
        let tag = format!("{}:{}", self.name, interface);
        let calls = Arc::clone(&self.calls);
        handler(move |_bus: &EventBus, _data: &EventData| {
            calls.lock().unwrap().push(tag.clone());
        })
    }
}

impl Feature for Probe {
    fn descriptor(&self) -> FeatureDescriptor {
        let mut descriptor = FeatureDescriptor::new(self.name.clone());
        for interface in &self.implements {
            descriptor = descriptor.implement(interface.clone(), self.recorder(interface));
        }
        for interface in &self.monitors {
            descriptor = descriptor.monitor(interface.clone(), self.recorder(interface));
        }
        for interface in &self.emits {
            descriptor = descriptor.emit(interface.clone());
        }
        descriptor
    }

    fn exit(&self) {
        self.exits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Feature monitoring `log` and keeping every message it sees.
pub struct LogCollector {
    pub messages: Calls,
}

impl LogCollector {
    pub fn module(messages: &Calls) -> FeatureModule {
        let messages = Arc::clone(messages);
        FeatureModule::new("collector", move |_ctx: &mut ModuleContext<'_>| {
            Ok(Arc::new(LogCollector {
                messages: Arc::clone(&messages),
            }) as Arc<dyn Feature>)
        })
    }
}

impl Feature for LogCollector {
    fn descriptor(&self) -> FeatureDescriptor {
        let messages = Arc::clone(&self.messages);
        FeatureDescriptor::new("test.collector").monitor(
            LOG,
            handler(move |_bus: &EventBus, data: &EventData| {
                if let Ok(record) = LogRecord::from_data(data) {
                    messages
                        .lock()
                        .unwrap()
                        .push(format!("{}: {}", record.category, record.message));
                }
            }),
        )
    }
}

/// Render cache implementing `request`. Answers `hit <key>` for keys it has
/// seen and `miss <key>` otherwise; the cache survives reloads.
pub struct CacheFeature {
    entries: Arc<Mutex<HashMap<String, String>>>,
    answers: Calls,
}

impl CacheFeature {
    pub fn module(answers: &Calls) -> FeatureModule {
        let answers = Arc::clone(answers);
        FeatureModule::new("cache", move |_ctx: &mut ModuleContext<'_>| {
            Ok(Arc::new(CacheFeature {
                entries: Arc::new(Mutex::new(HashMap::new())),
                answers: Arc::clone(&answers),
            }) as Arc<dyn Feature>)
        })
    }
}

impl Feature for CacheFeature {
    fn descriptor(&self) -> FeatureDescriptor {
        let entries = Arc::clone(&self.entries);
        let answers = Arc::clone(&self.answers);
        FeatureDescriptor::new("test.cache").implement(
            "request",
            handler(move |_bus: &EventBus, data: &EventData| {
                let key = data["key"].as_str().unwrap_or_default().to_string();
                let mut entries = entries.lock().unwrap();
                let answer = match entries.get(&key) {
                    Some(body) => format!("hit {}", body),
                    None => {
                        entries.insert(key.clone(), key.to_uppercase());
                        format!("miss {}", key)
                    }
                };
                answers.lock().unwrap().push(answer);
            }),
        )
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STATEFUL
    }

    fn save(&self) -> Result<StateBlob> {
        let entries = std::mem::take(&mut *self.entries.lock().unwrap());
        Ok(StateBlob::new(entries))
    }

    fn load(&self, state: StateBlob) -> Result<()> {
        if let Some(entries) = state.take::<HashMap<String, String>>("test.cache")? {
            *self.entries.lock().unwrap() = entries;
        }
        Ok(())
    }
}

/// Stateful feature recording `<feature>:save` and `<feature>:load blob|empty`.
/// It saves a `u32`; when rejecting blobs it insists on a `String`.
#[derive(Clone)]
pub struct TransferProbe {
    pub name: String,
    pub capabilities: Capabilities,
    pub fail_save: bool,
    pub reject_blobs: bool,
    pub calls: Calls,
}

impl TransferProbe {
    pub fn new(name: &str, calls: &Calls) -> Self {
        Self {
            name: name.to_string(),
            capabilities: Capabilities::STATEFUL,
            fail_save: false,
            reject_blobs: false,
            calls: Arc::clone(calls),
        }
    }

    pub fn load_only(mut self) -> Self {
        self.capabilities = Capabilities {
            save: false,
            load: true,
        };
        self
    }

    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn rejecting_blobs(mut self) -> Self {
        self.reject_blobs = true;
        self
    }

    pub fn module(&self, module_name: &str) -> FeatureModule {
        let template = self.clone();
        FeatureModule::new(module_name, move |_ctx: &mut ModuleContext<'_>| {
            Ok(Arc::new(template.clone()) as Arc<dyn Feature>)
        })
    }

    fn record(&self, what: &str) {
        self.calls.lock().unwrap().push(format!("{}:{}", self.name, what));
    }
}

impl Feature for TransferProbe {
    fn descriptor(&self) -> FeatureDescriptor {
        let tag = format!("{}:start", self.name);
        let calls = Arc::clone(&self.calls);
        FeatureDescriptor::new(self.name.clone()).monitor(
            START,
            handler(move |_bus: &EventBus, _data: &EventData| {
                calls.lock().unwrap().push(tag.clone());
            }),
        )
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn save(&self) -> Result<StateBlob> {
        self.record("save");
        if self.fail_save {
            return Err(ReloadError::StateTransfer {
                feature: self.name.clone(),
                expected: "snapshot".to_string(),
            }
            .into());
        }
        Ok(StateBlob::new(7u32))
    }

    fn load(&self, state: StateBlob) -> Result<()> {
        if state.is_empty() {
            self.record("load empty");
            return Ok(());
        }
        self.record("load blob");
        if self.reject_blobs {
            state.take::<String>(&self.name)?;
        } else {
            state.take::<u32>(&self.name)?;
        }
        Ok(())
    }
}

/// Payload for `request`.
pub fn request(key: &str) -> EventData {
    json!({ "key": key })
}
