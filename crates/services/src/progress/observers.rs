use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

pub(crate) type Observer = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: BTreeMap<u64, Observer>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callbacks keyed by subscription id.
#[derive(Clone, Default)]
pub(crate) struct ObserverSet {
    registry: Arc<Mutex<Registry>>,
}

impl ObserverSet {
    pub(crate) fn register(&self, observer: Observer) -> Subscription {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.insert(id, observer);
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            active: AtomicBool::new(true),
        }
    }

    /// Call every registered observer.
    ///
    /// Observers run outside the registry lock, so they may subscribe,
    /// unsubscribe, or trigger another notification.
    pub(crate) fn notify(&self) {
        let observers: Vec<Observer> = lock(&self.registry).observers.values().cloned().collect();
        for observer in observers {
            observer();
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.registry).observers.len()
    }
}

/// Handle to a registered progress observer.
///
/// Dropping the handle unsubscribes the observer.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
    active: AtomicBool,
}

impl Subscription {
    /// Stop receiving notifications. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).observers.remove(&self.id);
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
