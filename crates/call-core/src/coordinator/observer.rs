//! Observer registry
//!
//! Observers are called synchronously while the coordinator's state lock is
//! held, so each one sees snapshots in exactly the order the changes were
//! made. An observer must therefore not call back into the
//! [`CallCoordinator`](super::CallCoordinator) from inside
//! [`on_call_state_changed`](CallObserver::on_call_state_changed); requesting
//! actions through a [`CoordinatorHandle`](crate::service::CoordinatorHandle)
//! is fine.

use std::fmt;
use std::sync::Arc;

use crate::call::CallSnapshot;

/// Receives the complete coordinator state after every change
pub trait CallObserver: Send + Sync {
    fn on_call_state_changed(&self, snapshot: &CallSnapshot);
}

impl<F> CallObserver for F
where
    F: Fn(&CallSnapshot) + Send + Sync,
{
    fn on_call_state_changed(&self, snapshot: &CallSnapshot) {
        self(snapshot)
    }
}

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<dyn CallObserver>)>,
}

impl ObserverRegistry {
    pub(crate) fn insert(&mut self, observer: Arc<dyn CallObserver>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub(crate) fn notify(&self, snapshot: &CallSnapshot) {
        for (_, observer) in &self.observers {
            observer.on_call_state_changed(snapshot);
        }
    }

    pub(crate) fn notify_one(&self, id: ObserverId, snapshot: &CallSnapshot) {
        if let Some((_, observer)) = self.observers.iter().find(|(existing, _)| *existing == id) {
            observer.on_call_state_changed(snapshot);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioRouteState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unregistered_observers_are_not_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ObserverRegistry::default();

        let id = registry.insert(Arc::new(move |_: &CallSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let snapshot = CallSnapshot::idle(AudioRouteState::default());

        registry.notify(&snapshot);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.notify(&snapshot);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 0);
    }
}
