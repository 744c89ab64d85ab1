use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lesson_core::model::{CompletionSet, LessonSlug};
use storage::{ChangeNotice, StorageArea, StorageEvent, StorageEvents};
use tokio::sync::oneshot;

use super::observers::{ObserverSet, Subscription};

/// Storage key holding the serialized completion set.
pub const PROGRESS_STORAGE_KEY: &str = "progress";

struct State {
    completed: Arc<CompletionSet>,
    initialized: bool,
}

/// Tracks which lessons the learner has completed.
///
/// One store is created per context and shared by every view that shows
/// progress. The store reads its storage slot once, on first use, and after
/// that keeps the in-memory set authoritative: local changes are written
/// through to storage, and changes written by other contexts of the same
/// origin replace the in-memory set wholesale (last write wins).
///
/// No operation fails. When storage is missing or refuses a read or write the
/// store logs a warning and keeps working from memory.
pub struct ProgressStore {
    storage: Option<Arc<dyn StorageArea>>,
    state: Mutex<State>,
    observers: ObserverSet,
    events: Mutex<Option<StorageEvents>>,
    // dropped with the store, which ends the sync task
    sync_stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageArea>) -> Self {
        Self::with_storage(Some(storage))
    }

    /// A store with no durable storage. Progress lasts for the process only.
    #[must_use]
    pub fn memory_only() -> Self {
        Self::with_storage(None)
    }

    fn with_storage(storage: Option<Arc<dyn StorageArea>>) -> Self {
        Self {
            storage,
            state: Mutex::new(State {
                completed: Arc::new(CompletionSet::new()),
                initialized: false,
            }),
            observers: ObserverSet::default(),
            events: Mutex::new(None),
            sync_stop: Mutex::new(None),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn lock_events(&self) -> MutexGuard<'_, Option<StorageEvents>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signal that resolves once this store is dropped.
    pub(super) fn stop_signal(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        *self.sync_stop.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    /// Load persisted progress and start watching for changes from other
    /// contexts. Only the first call does anything.
    pub fn initialize(&self) {
        let mut state = self.lock_state();
        if state.initialized {
            return;
        }
        state.initialized = true;

        // watch before reading so no write from another context slips between
        if let Some(storage) = &self.storage {
            *self.lock_events() = storage.watch();
        }
        let loaded = self.read_persisted();
        tracing::debug!(completed = loaded.len(), "progress loaded");

        let changed = *state.completed != loaded;
        state.completed = Arc::new(loaded);
        drop(state);

        if changed {
            self.observers.notify();
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock_state().initialized
    }

    /// Current completion set.
    ///
    /// Repeated calls return the same `Arc` until the set changes, so callers
    /// can detect changes with `Arc::ptr_eq`. Before initialization this is
    /// the empty set.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CompletionSet> {
        Arc::clone(&self.lock_state().completed)
    }

    #[must_use]
    pub fn is_completed(&self, slug: &str) -> bool {
        self.lock_state().completed.contains(slug)
    }

    /// Register `observer` to run after every change to the completion set.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.initialize();
        self.observers.register(Arc::new(observer))
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Mark a lesson complete. Does nothing if it already is.
    pub fn mark_completed(&self, slug: impl Into<LessonSlug>) {
        let slug = slug.into();
        self.update("mark", |set| set.insert(slug));
    }

    /// Flip a lesson between complete and not complete.
    pub fn toggle_completed(&self, slug: impl Into<LessonSlug>) {
        let slug = slug.into();
        self.update("toggle", |set| {
            set.toggle(slug);
            true
        });
    }

    /// Forget all progress. Always persists and notifies, even when empty.
    pub fn reset_progress(&self) {
        self.update("reset", |set| {
            set.clear();
            true
        });
    }

    fn update(&self, op: &'static str, apply: impl FnOnce(&mut CompletionSet) -> bool) {
        self.initialize();

        let mut state = self.lock_state();
        let mut next = CompletionSet::clone(&state.completed);
        if !apply(&mut next) {
            return;
        }
        self.persist(&next);
        tracing::debug!(op, completed = next.len(), "progress updated");
        state.completed = Arc::new(next);
        drop(state);

        self.observers.notify();
    }

    fn persist(&self, completed: &CompletionSet) {
        let Some(storage) = &self.storage else {
            return;
        };
        let raw = match completed.encode() {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode progress; keeping it in memory");
                return;
            }
        };
        if let Err(err) = storage.set_item(PROGRESS_STORAGE_KEY, &raw) {
            tracing::warn!(error = %err, "failed to persist progress; keeping it in memory");
        }
    }

    fn read_persisted(&self) -> CompletionSet {
        let Some(storage) = &self.storage else {
            return CompletionSet::new();
        };
        match storage.get_item(PROGRESS_STORAGE_KEY) {
            Ok(None) => CompletionSet::new(),
            Ok(Some(raw)) => CompletionSet::try_decode(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "discarding unreadable progress");
                CompletionSet::new()
            }),
            Err(err) => {
                tracing::warn!(error = %err, "progress storage unavailable");
                CompletionSet::new()
            }
        }
    }

    fn replace(&self, next: CompletionSet) {
        let mut state = self.lock_state();
        state.completed = Arc::new(next);
        drop(state);
        self.observers.notify();
    }

    /// Apply a change made to storage by another context.
    ///
    /// Events for other keys are ignored. A key-less event (the area was
    /// cleared) or a removed slot reads as no progress. Returns whether the
    /// event concerned progress.
    pub fn apply_storage_event(&self, event: &StorageEvent) -> bool {
        if event
            .key
            .as_deref()
            .is_some_and(|key| key != PROGRESS_STORAGE_KEY)
        {
            return false;
        }

        let next = CompletionSet::decode(event.new_value.as_deref());
        tracing::debug!(
            source = %event.source,
            completed = next.len(),
            "progress changed in another context"
        );
        self.replace(next);
        true
    }

    /// Re-read the storage slot and replace the in-memory set with it.
    pub fn resync(&self) {
        let next = self.read_persisted();
        self.replace(next);
    }

    pub(super) fn handle_notice(&self, notice: ChangeNotice) -> bool {
        match notice {
            ChangeNotice::Changed(event) => self.apply_storage_event(&event),
            ChangeNotice::Missed(count) => {
                tracing::warn!(missed = count, "missed storage events; re-reading progress");
                self.resync();
                true
            }
        }
    }

    /// Apply every pending change from other contexts without waiting.
    ///
    /// Returns how many of them concerned progress. Does nothing once
    /// [`ProgressStore::spawn_sync`] has taken over event delivery.
    pub fn pump_storage_events(&self) -> usize {
        let mut applied = 0;
        loop {
            // release the lock before applying: observers may pump again
            let notice = match self.lock_events().as_mut() {
                Some(events) => events.try_next(),
                None => None,
            };
            let Some(notice) = notice else {
                break;
            };
            if self.handle_notice(notice) {
                applied += 1;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::{Origin, UnavailableStorage};

    fn store_on(origin: &Origin) -> ProgressStore {
        ProgressStore::new(Arc::new(origin.open_context()))
    }

    fn counting(store: &ProgressStore) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sub = store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    fn persisted(origin: &Origin) -> Option<String> {
        origin
            .open_context()
            .get_item(PROGRESS_STORAGE_KEY)
            .unwrap()
    }

    #[test]
    fn snapshot_before_initialization_is_empty() {
        let origin = Origin::in_memory();
        origin
            .open_context()
            .set_item(PROGRESS_STORAGE_KEY, "[\"jsx\"]")
            .unwrap();

        let store = store_on(&origin);
        assert!(!store.is_initialized());
        assert!(store.snapshot().is_empty());

        let _sub = store.subscribe(|| {});
        assert!(store.is_completed("jsx"));
    }

    #[test]
    fn snapshot_is_stable_between_changes() {
        let store = ProgressStore::memory_only();
        store.mark_completed("jsx");
        let a = store.snapshot();
        let b = store.snapshot();
        assert!(Arc::ptr_eq(&a, &b));

        store.mark_completed("props");
        assert!(!Arc::ptr_eq(&a, &store.snapshot()));
    }

    #[test]
    fn mark_is_idempotent_and_silent_on_repeat() {
        let origin = Origin::in_memory();
        let store = store_on(&origin);
        let (count, _sub) = counting(&store);

        store.mark_completed("state");
        let first = store.snapshot();
        store.mark_completed("state");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &store.snapshot()));
        assert_eq!(persisted(&origin).as_deref(), Some("[\"state\"]"));
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let store = ProgressStore::memory_only();
        store.mark_completed("jsx");
        store.toggle_completed("props");
        store.toggle_completed("props");
        assert!(!store.is_completed("props"));
        assert!(store.is_completed("jsx"));
    }

    #[test]
    fn reset_always_persists_and_notifies() {
        let origin = Origin::in_memory();
        let store = store_on(&origin);
        let (count, _sub) = counting(&store);

        store.reset_progress();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(persisted(&origin).as_deref(), Some("[]"));

        store.mark_completed("events");
        store.reset_progress();
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(store.snapshot().is_empty());
        assert!(!store.is_completed("events"));
    }

    #[test]
    fn corrupt_blob_loads_as_empty() {
        let origin = Origin::in_memory();
        origin
            .open_context()
            .set_item(PROGRESS_STORAGE_KEY, "{\"jsx\":true}")
            .unwrap();

        let store = store_on(&origin);
        store.initialize();
        assert!(store.snapshot().is_empty());

        store.mark_completed("jsx");
        assert_eq!(persisted(&origin).as_deref(), Some("[\"jsx\"]"));
    }

    #[test]
    fn unavailable_storage_degrades_to_memory() {
        let store = ProgressStore::new(Arc::new(UnavailableStorage));
        let (count, _sub) = counting(&store);

        store.mark_completed("forms");
        store.toggle_completed("jsx");
        assert!(store.is_completed("forms"));
        assert!(store.is_completed("jsx"));

        store.reset_progress();
        assert!(store.snapshot().is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn quota_failure_keeps_memory_state() {
        let origin = Origin::in_memory_with_quota(16);
        let store = store_on(&origin);

        store.mark_completed("a");
        store.mark_completed("conditional-rendering");

        assert!(store.is_completed("conditional-rendering"));
        assert_eq!(persisted(&origin).as_deref(), Some("[\"a\"]"));
    }

    #[test]
    fn mutation_before_subscribe_keeps_persisted_progress() {
        let origin = Origin::in_memory();
        origin
            .open_context()
            .set_item(PROGRESS_STORAGE_KEY, "[\"jsx\"]")
            .unwrap();

        let store = store_on(&origin);
        store.mark_completed("props");
        assert_eq!(persisted(&origin).as_deref(), Some("[\"jsx\",\"props\"]"));
    }

    #[test]
    fn initialize_is_idempotent() {
        let origin = Origin::in_memory();
        let store = store_on(&origin);
        store.initialize();

        origin
            .open_context()
            .set_item(PROGRESS_STORAGE_KEY, "[\"jsx\"]")
            .unwrap();
        store.initialize();
        // a second initialize does not re-read storage
        assert!(!store.is_completed("jsx"));
    }

    #[test]
    fn events_for_other_keys_are_ignored() {
        let origin = Origin::in_memory();
        let store = store_on(&origin);
        let (count, _sub) = counting(&store);

        origin.open_context().set_item("theme", "dark").unwrap();
        assert_eq!(store.pump_storage_events(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cleared_area_reads_as_no_progress() {
        let origin = Origin::in_memory();
        let store = store_on(&origin);
        let _sub = store.subscribe(|| {});
        store.mark_completed("jsx");

        origin.open_context().clear().unwrap();
        assert_eq!(store.pump_storage_events(), 1);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn local_writes_do_not_echo() {
        let origin = Origin::in_memory();
        let store = store_on(&origin);
        let (count, _sub) = counting(&store);

        store.toggle_completed("jsx");
        assert_eq!(store.pump_storage_events(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_can_read_and_mutate_during_notify() {
        let store = Arc::new(ProgressStore::memory_only());
        let inner = Arc::clone(&store);
        let _sub = store.subscribe(move || {
            if inner.is_completed("jsx") && !inner.is_completed("props") {
                inner.mark_completed("props");
            }
        });

        store.mark_completed("jsx");
        assert!(store.is_completed("props"));
    }
}
