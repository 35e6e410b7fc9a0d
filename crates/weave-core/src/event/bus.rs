use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::event::error::EventError;
use crate::event::{EventData, Handler, SubscriptionId};

/// Subscriber table behind an [`EventBus`].
struct BusState {
    handlers: HashMap<String, Vec<(SubscriptionId, Handler)>>,
    next_handler_id: SubscriptionId,
    /// Every interface that ever accepted a subscription. Never shrinks.
    used: BTreeSet<String>,
    retired: bool,
}

impl BusState {
    fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_handler_id: 1,
            used: BTreeSet::new(),
            retired: false,
        }
    }

    fn insert(&mut self, interface: &str, handler: Handler) -> SubscriptionId {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        self.handlers
            .entry(interface.to_string())
            .or_default()
            .push((id, handler));
        self.used.insert(interface.to_string());
        id
    }
}

/// Dispatch table mapping interface names to ordered subscriber lists.
///
/// Handlers run in subscription order. `publish` snapshots the subscriber
/// list before invoking anything, so handlers may publish, subscribe or
/// unsubscribe re-entrantly without deadlocking.
#[derive(Clone)]
pub struct EventBus {
    state: Arc<Mutex<BusState>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        let handler_count: usize = state.handlers.values().map(|v| v.len()).sum();
        f.debug_struct("EventBus")
            .field("handler_count", &handler_count)
            .field("used_interfaces", &state.used.len())
            .field("next_handler_id", &state.next_handler_id)
            .field("retired", &state.retired)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `handler` to the subscriber list of `interface`.
    pub fn subscribe(
        &self,
        interface: &str,
        handler: Handler,
    ) -> std::result::Result<SubscriptionId, EventError> {
        let mut state = self.lock();
        if state.retired {
            return Err(EventError::BusRetired {
                interface: interface.to_string(),
            });
        }
        Ok(state.insert(interface, handler))
    }

    /// Remove one subscription. Returns `false` if the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        let mut found = false;
        state.handlers.values_mut().for_each(|handlers| {
            let len_before = handlers.len();
            handlers.retain(|(h_id, _)| *h_id != id);
            if handlers.len() < len_before {
                found = true;
            }
        });
        state.handlers.retain(|_, handlers| !handlers.is_empty());
        found
    }

    /// Detach every subscriber. Returns how many were removed.
    pub fn unsubscribe_all(&self) -> usize {
        let mut state = self.lock();
        let removed = state.handlers.values().map(|v| v.len()).sum();
        state.handlers.clear();
        removed
    }

    /// Deliver `data` to every subscriber of `interface`, in order.
    /// Returns the number of handlers invoked.
    pub fn publish(&self, interface: &str, data: &EventData) -> usize {
        let snapshot: Vec<Handler> = {
            let state = self.lock();
            match state.handlers.get(interface) {
                Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return 0,
            }
        };
        for handler in &snapshot {
            handler(self, data);
        }
        snapshot.len()
    }

    /// Interfaces that have ever accepted a subscription on this bus.
    pub fn used_interfaces(&self) -> Vec<String> {
        self.lock().used.iter().cloned().collect()
    }

    pub fn subscriber_count(&self, interface: &str) -> usize {
        self.lock().handlers.get(interface).map_or(0, |v| v.len())
    }

    pub fn has_subscribers(&self, interface: &str) -> bool {
        self.subscriber_count(interface) > 0
    }

    pub fn is_retired(&self) -> bool {
        self.lock().retired
    }

    /// Whether both handles point at the same dispatch table.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Retire this bus in favour of `target`.
    ///
    /// All listeners are detached, then every interface this bus ever
    /// accepted subscriptions for gets a forwarder that re-publishes the
    /// event, unmodified, on `target`. Returns the number of forwarders.
    pub fn redirect_to(&self, target: &EventBus) -> usize {
        let mut state = self.lock();
        state.handlers.clear();
        let interfaces: Vec<String> = state.used.iter().cloned().collect();
        for interface in &interfaces {
            let forward_to = target.clone();
            let name = interface.clone();
            let forwarder: Handler = Arc::new(move |_bus: &EventBus, data: &EventData| {
                forward_to.publish(&name, data);
            });
            state.insert(interface, forwarder);
        }
        state.retired = true;
        log::debug!("Redirected {} interface(s) to replacement bus", interfaces.len());
        interfaces.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
