use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::store::ProgressStore;

impl ProgressStore {
    /// Apply changes from other contexts as they arrive, on the current
    /// tokio runtime.
    ///
    /// Returns `None` when called outside a runtime or when the store's
    /// storage cannot report changes; use
    /// [`ProgressStore::pump_storage_events`] instead in that case. The task
    /// ends once the store is dropped or the origin goes away.
    pub fn spawn_sync(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let runtime = Handle::try_current().ok()?;
        self.initialize();
        let mut events = self.lock_events().take()?;
        let mut stop = self.stop_signal();
        let store: Weak<Self> = Arc::downgrade(self);

        Some(runtime.spawn(async move {
            loop {
                let notice = tokio::select! {
                    notice = events.next() => notice,
                    _ = &mut stop => None,
                };
                let Some(notice) = notice else {
                    break;
                };
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.handle_notice(notice);
            }
            tracing::debug!("progress sync stopped");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{Origin, UnavailableStorage};

    #[test]
    fn no_runtime_no_task() {
        let store = Arc::new(ProgressStore::new(Arc::new(Origin::in_memory().open_context())));
        assert!(store.spawn_sync().is_none());
    }

    #[tokio::test]
    async fn storage_without_events_has_nothing_to_sync() {
        let store = Arc::new(ProgressStore::new(Arc::new(UnavailableStorage)));
        assert!(store.spawn_sync().is_none());
        assert!(Arc::new(ProgressStore::memory_only()).spawn_sync().is_none());
    }

    #[tokio::test]
    async fn sync_takes_over_from_pumping() {
        let origin = Origin::in_memory();
        let store = Arc::new(ProgressStore::new(Arc::new(origin.open_context())));
        let task = store.spawn_sync();
        assert!(task.is_some());
        // a second call finds the events already taken
        assert!(store.spawn_sync().is_none());
        assert_eq!(store.pump_storage_events(), 0);
    }
}
