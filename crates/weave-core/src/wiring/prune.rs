use crate::event::{EventBus, LogCategory, StartupQueue};
use crate::feature::{FeatureSet, LoadedFeature};
use crate::wiring::aggregate::Bindings;
use crate::wiring::trace::Trace;

/// Remove every feature not reachable from the root interfaces.
///
/// The removed features' subscriptions are detached and their `exit` hook
/// runs. Returns the removed features in name order.
pub fn prune(
    features: &mut FeatureSet,
    trace: &mut Trace,
    bindings: &mut Bindings,
    bus: &EventBus,
    queue: &mut StartupQueue,
) -> Vec<LoadedFeature> {
    queue.log(LogCategory::Log, "Tracing feature usage.");
    trace.mark_used();

    let mut removed = Vec::new();
    for name in trace.unreachable() {
        queue.log(LogCategory::Log, format!("Removing unreachable feature {}.", name));
        for id in bindings.take(&name) {
            bus.unsubscribe(id);
        }
        if let Some(feature) = features.remove(&name) {
            feature.feature.exit();
            removed.push(feature);
        }
    }
    removed
}
