use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

use crate::config::CommandLine;
use crate::event::FallbackSink;
use crate::feature::FeatureCatalog;
use crate::kernel::ComposeOptions;
use crate::tests::support::{calls, CacheFeature, Calls, LogCollector, Probe, TransferProbe};

/// A program made of a log collector, a `client` raising `request` on
/// start, and the stateful `cache` answering it. The config lives in
/// `<root>/app`.
pub struct Fixture {
    pub root: TempDir,
    pub logs: Calls,
    pub client_calls: Calls,
    pub answers: Calls,
    pub client: Probe,
    pub fallback: Calls,
    /// Registered as module `transfer` when set.
    pub transfer: Option<TransferProbe>,
}

impl Fixture {
    pub fn new(config: Value) -> Self {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("app")).unwrap();
        let client_calls = calls();
        let client = Probe::new("client", &client_calls)
            .implements("start")
            .emits("request");
        let fixture = Self {
            root,
            logs: calls(),
            client_calls,
            answers: calls(),
            client,
            fallback: calls(),
            transfer: None,
        };
        fixture.write_config(config);
        fixture
    }

    /// Collector, client and cache, nothing else.
    pub fn basic() -> Self {
        Self::new(json!({
            "dependencies": { "collector": {}, "client": {}, "cache": {} }
        }))
    }

    /// Collector, client, cache and `transfer`.
    pub fn with_transfer(probe: TransferProbe) -> Self {
        let mut fixture = Self::new(json!({
            "dependencies": { "collector": {}, "client": {}, "cache": {}, "transfer": {} }
        }));
        fixture.transfer = Some(probe);
        fixture
    }

    pub fn write_config(&self, config: Value) {
        fs::write(self.root.path().join("app/config.json"), config.to_string()).unwrap();
    }

    pub fn catalog(&self) -> Arc<FeatureCatalog> {
        let mut catalog = FeatureCatalog::new();
        catalog.register(LogCollector::module(&self.logs)).unwrap();
        catalog.register(self.client.module("client")).unwrap();
        catalog.register(CacheFeature::module(&self.answers)).unwrap();
        catalog.register(crate::reload::dynamo::module()).unwrap();
        if let Some(transfer) = &self.transfer {
            catalog.register(transfer.module("transfer")).unwrap();
        }
        Arc::new(catalog)
    }

    pub fn options(&self) -> ComposeOptions {
        let fallback = Arc::clone(&self.fallback);
        let sink: FallbackSink = Arc::new(move |line: &str| {
            fallback.lock().unwrap().push(line.to_string());
        });
        ComposeOptions::new(self.root.path(), CommandLine::parse(["config=app"])).with_fallback(sink)
    }
}
