use std::collections::{BTreeMap, BTreeSet};

use crate::event::ROOT_INTERFACES;

/// Reachability bookkeeping built during registration and wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    features: BTreeSet<String>,
    used: BTreeSet<String>,
    emits: BTreeMap<String, Vec<String>>,
    consumes: BTreeMap<String, BTreeSet<String>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a loaded feature and the interfaces it may raise.
    pub fn add_feature(&mut self, feature: &str, emits: Vec<String>) {
        self.features.insert(feature.to_string());
        self.emits.insert(feature.to_string(), emits);
    }

    /// Record that `feature` has a handler bound to `interface`.
    pub fn record_consumer(&mut self, interface: &str, feature: &str) {
        self.consumes
            .entry(interface.to_string())
            .or_default()
            .insert(feature.to_string());
    }

    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    pub fn used(&self) -> &BTreeSet<String> {
        &self.used
    }

    pub fn emits_of(&self, feature: &str) -> &[String] {
        self.emits.get(feature).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn consumers_of(&self, interface: &str) -> Option<&BTreeSet<String>> {
        self.consumes.get(interface)
    }

    /// Features reachable from the root interfaces, without touching `used`.
    pub fn reachable(&self) -> BTreeSet<String> {
        let mut reached = BTreeSet::new();
        let mut pending: Vec<&str> = ROOT_INTERFACES.to_vec();
        while let Some(interface) = pending.pop() {
            let Some(consumers) = self.consumes.get(interface) else {
                continue;
            };
            for feature in consumers {
                if reached.insert(feature.clone()) {
                    pending.extend(self.emits_of(feature).iter().map(String::as_str));
                }
            }
        }
        reached
    }

    /// Replace `used` with the reachable set. Running it again yields the
    /// same set.
    pub fn mark_used(&mut self) -> &BTreeSet<String> {
        self.used = self.reachable();
        &self.used
    }

    /// Loaded features outside `used`, in name order.
    pub fn unreachable(&self) -> Vec<String> {
        self.features.difference(&self.used).cloned().collect()
    }
}
