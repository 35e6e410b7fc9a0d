use std::collections::BTreeMap;

use crate::event::{EventBus, LogCategory, ROOT_INTERFACES, StartupQueue, SubscriptionId};
use crate::feature::{FeatureSet, InterfaceRegistry};
use crate::kernel::error::Result;
use crate::wiring::trace::Trace;

/// Subscriptions made for each feature during wiring.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    by_feature: BTreeMap<String, Vec<SubscriptionId>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, feature: &str, id: SubscriptionId) {
        self.by_feature.entry(feature.to_string()).or_default().push(id);
    }

    pub fn of(&self, feature: &str) -> &[SubscriptionId] {
        self.by_feature.get(feature).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Forget and return the subscriptions of `feature`.
    pub fn take(&mut self, feature: &str) -> Vec<SubscriptionId> {
        self.by_feature.remove(feature).unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.by_feature.values().map(Vec::len).sum()
    }
}

/// Bind every registered handler to `bus`.
///
/// Warnings for dangling and unused interfaces go to `queue`. Monitors of an
/// interface are subscribed before its implementation.
pub fn wire(
    features: &FeatureSet,
    registry: &InterfaceRegistry,
    trace: &mut Trace,
    bus: &EventBus,
    queue: &mut StartupQueue,
) -> Result<Bindings> {
    queue.log(LogCategory::Log, "Features loaded, assembling program.");

    for interface in &registry.interfaces {
        if ROOT_INTERFACES.contains(&interface.as_str()) {
            continue;
        }
        if !registry.implementations.contains_key(interface) && !registry.is_monitored(interface) {
            queue.log(
                LogCategory::Warn,
                format!(
                    "Interface {} can be called but is not implemented or monitored by anything.",
                    interface
                ),
            );
        }
    }

    let mut bindings = Bindings::new();

    for (feature_name, interfaces) in &registry.monitors {
        let Some(loaded) = features.get(feature_name) else {
            continue;
        };
        for interface in interfaces {
            if !registry.interfaces.contains(interface) {
                queue.log(
                    LogCategory::Warn,
                    format!(
                        "Feature {} monitors interface {} which is never used.",
                        feature_name, interface
                    ),
                );
                continue;
            }
            if let Some(handler) = loaded.descriptor.monitors.get(interface) {
                let id = bus.subscribe(interface, handler.clone())?;
                bindings.record(feature_name, id);
                trace.record_consumer(interface, feature_name);
            }
        }
    }

    for (interface, feature_name) in &registry.implementations {
        if !registry.interfaces.contains(interface) {
            queue.log(
                LogCategory::Warn,
                format!(
                    "Feature {} implements interface {} which is never used.",
                    feature_name, interface
                ),
            );
            continue;
        }
        let Some(loaded) = features.get(feature_name) else {
            continue;
        };
        if let Some(handler) = loaded.descriptor.implements.get(interface) {
            let id = bus.subscribe(interface, handler.clone())?;
            bindings.record(feature_name, id);
            trace.record_consumer(interface, feature_name);
        }
    }

    log::debug!("Wired {} subscription(s)", bindings.total());
    Ok(bindings)
}
