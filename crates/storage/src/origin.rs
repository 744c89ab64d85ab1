//! Per-origin storage shared by every context (tab) of the origin.
//!
//! An [`Origin`] owns the authoritative item map. Each context gets its own
//! [`OriginStorage`] handle; writes made through one handle are broadcast to
//! the watchers of every other handle, never back to the writer. When the
//! origin is backed by an [`ItemRepository`], writes are queued and applied
//! in order by a background task.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::repository::{ContextId, ItemRepository, StorageArea, StorageError, StorageEvent};

/// Default per-origin quota, matching common browser limits.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

const EVENT_BUFFER: usize = 64;

#[derive(Debug)]
enum WriteCommand {
    Put { key: String, value: String },
    Delete { key: String },
    Clear,
    Flush(oneshot::Sender<()>),
}

struct Shared {
    items: Mutex<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    quota_bytes: usize,
    writer: Option<mpsc::UnboundedSender<WriteCommand>>,
}

impl Shared {
    fn lock_items(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn queue_write(&self, command: WriteCommand) {
        let Some(writer) = &self.writer else {
            return;
        };
        if writer.send(command).is_err() {
            tracing::warn!("storage writer has stopped; change kept in memory only");
        }
    }

    fn publish(&self, event: StorageEvent) {
        // no receivers is fine: nobody else is watching
        let _ = self.events.send(event);
    }
}

fn used_bytes(items: &BTreeMap<String, String>) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// The storage shared by all contexts of one origin.
#[derive(Clone)]
pub struct Origin {
    shared: Arc<Shared>,
}

impl Origin {
    fn build(
        items: BTreeMap<String, String>,
        quota_bytes: usize,
        writer: Option<mpsc::UnboundedSender<WriteCommand>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            shared: Arc::new(Shared {
                items: Mutex::new(items),
                events,
                quota_bytes,
                writer,
            }),
        }
    }

    /// An origin that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::build(BTreeMap::new(), DEFAULT_QUOTA_BYTES, None)
    }

    /// An in-memory origin with a custom quota.
    #[must_use]
    pub fn in_memory_with_quota(quota_bytes: usize) -> Self {
        Self::build(BTreeMap::new(), quota_bytes, None)
    }

    /// An origin hydrated from `repo` that persists every change back to it.
    ///
    /// Must be called from within a tokio runtime; the writer task is spawned
    /// on it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the persisted items cannot be loaded.
    pub async fn with_repository(repo: Arc<dyn ItemRepository>) -> Result<Self, StorageError> {
        let items: BTreeMap<String, String> = repo.load_items().await?.into_iter().collect();
        tracing::info!(items = items.len(), "hydrated origin storage");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(repo, rx));
        Ok(Self::build(items, DEFAULT_QUOTA_BYTES, Some(tx)))
    }

    /// Open a storage handle for a new context of this origin.
    #[must_use]
    pub fn open_context(&self) -> OriginStorage {
        OriginStorage {
            shared: Arc::clone(&self.shared),
            context: ContextId::new(),
        }
    }

    /// Wait until every queued write has reached the repository.
    ///
    /// Returns immediately for in-memory origins.
    pub async fn flush(&self) {
        let Some(writer) = &self.shared.writer else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if writer.send(WriteCommand::Flush(done_tx)).is_err() {
            return;
        }
        // a dropped sender means the writer stopped; nothing left to wait on
        let _ = done_rx.await;
    }

    /// Number of stored items.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the item lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.shared.lock_items()?.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the item lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    #[must_use]
    pub fn quota_bytes(&self) -> usize {
        self.shared.quota_bytes
    }
}

async fn run_writer(repo: Arc<dyn ItemRepository>, mut rx: mpsc::UnboundedReceiver<WriteCommand>) {
    while let Some(command) = rx.recv().await {
        let result = match command {
            WriteCommand::Put { key, value } => repo.put_item(&key, &value).await,
            WriteCommand::Delete { key } => repo.delete_item(&key).await,
            WriteCommand::Clear => repo.clear_items().await,
            WriteCommand::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to persist storage change");
        }
    }
    tracing::debug!("storage writer stopped");
}

/// One context's view of an [`Origin`].
#[derive(Clone)]
pub struct OriginStorage {
    shared: Arc<Shared>,
    context: ContextId,
}

impl OriginStorage {
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    fn event(
        &self,
        key: Option<&str>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> StorageEvent {
        StorageEvent {
            key: key.map(str::to_owned),
            old_value,
            new_value,
            source: self.context,
        }
    }
}

impl StorageArea for OriginStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.shared.lock_items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.shared.lock_items()?;
        let old_value = items.get(key).cloned();
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }

        let old_len = old_value.as_ref().map_or(0, |old| key.len() + old.len());
        let needed = used_bytes(&items) - old_len + key.len() + value.len();
        if needed > self.shared.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                needed,
                quota: self.shared.quota_bytes,
            });
        }

        items.insert(key.to_owned(), value.to_owned());
        self.shared.queue_write(WriteCommand::Put {
            key: key.to_owned(),
            value: value.to_owned(),
        });
        self.shared.publish(self.event(Some(key), old_value, Some(value.to_owned())));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.shared.lock_items()?;
        let Some(old_value) = items.remove(key) else {
            return Ok(());
        };
        self.shared.queue_write(WriteCommand::Delete {
            key: key.to_owned(),
        });
        self.shared.publish(self.event(Some(key), Some(old_value), None));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut items = self.shared.lock_items()?;
        if items.is_empty() {
            return Ok(());
        }
        items.clear();
        self.shared.queue_write(WriteCommand::Clear);
        self.shared.publish(self.event(None, None, None));
        Ok(())
    }

    fn watch(&self) -> Option<StorageEvents> {
        Some(StorageEvents {
            rx: self.shared.events.subscribe(),
            context: self.context,
        })
    }
}

/// What a watcher learns about other contexts' writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeNotice {
    Changed(StorageEvent),
    /// The watcher fell behind and this many events were dropped; re-read
    /// whatever state you derive from storage. Events buffered at the time
    /// are dropped as well and counted here.
    Missed(u64),
}

/// Stream of changes made by other contexts of the same origin.
pub struct StorageEvents {
    rx: broadcast::Receiver<StorageEvent>,
    context: ContextId,
}

impl StorageEvents {
    /// Next pending change, without waiting.
    ///
    /// Returns `None` when nothing is pending or the origin is gone.
    pub fn try_next(&mut self) -> Option<ChangeNotice> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.source == self.context => {}
                Ok(event) => return Some(ChangeNotice::Changed(event)),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(self.skip_backlog(n));
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Discard everything still buffered after a lag.
    ///
    /// The retained events are all older than the current stored state, so a
    /// watcher that re-reads after `Missed` must not see them replayed.
    fn skip_backlog(&mut self, lagged: u64) -> ChangeNotice {
        let mut missed = lagged;
        loop {
            match self.rx.try_recv() {
                Ok(_) => missed += 1,
                Err(broadcast::error::TryRecvError::Lagged(n)) => missed += n,
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return ChangeNotice::Missed(missed),
            }
        }
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the origin and every handle to it are gone.
    pub async fn next(&mut self) -> Option<ChangeNotice> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.source == self.context => {}
                Ok(event) => return Some(ChangeNotice::Changed(event)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Some(self.skip_backlog(n));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryItemRepository;

    #[test]
    fn contexts_share_items() {
        let origin = Origin::in_memory();
        let a = origin.open_context();
        let b = origin.open_context();

        a.set_item("progress", "[\"jsx\"]").unwrap();
        assert_eq!(b.get_item("progress").unwrap().as_deref(), Some("[\"jsx\"]"));
        assert_eq!(origin.len().unwrap(), 1);

        b.remove_item("progress").unwrap();
        assert!(a.get_item("progress").unwrap().is_none());
    }

    #[test]
    fn writer_does_not_see_its_own_events() {
        let origin = Origin::in_memory();
        let a = origin.open_context();
        let b = origin.open_context();
        let mut a_events = a.watch().unwrap();
        let mut b_events = b.watch().unwrap();

        a.set_item("progress", "[\"props\"]").unwrap();

        assert!(a_events.try_next().is_none());
        let Some(ChangeNotice::Changed(event)) = b_events.try_next() else {
            panic!("expected a change for the other context");
        };
        assert_eq!(event.key.as_deref(), Some("progress"));
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value.as_deref(), Some("[\"props\"]"));
        assert_eq!(event.source, a.context());
        assert!(b_events.try_next().is_none());
    }

    #[test]
    fn unchanged_value_publishes_nothing() {
        let origin = Origin::in_memory();
        let a = origin.open_context();
        let mut b_events = origin.open_context().watch().unwrap();

        a.set_item("progress", "[]").unwrap();
        a.set_item("progress", "[]").unwrap();

        assert!(matches!(b_events.try_next(), Some(ChangeNotice::Changed(_))));
        assert!(b_events.try_next().is_none());
    }

    #[test]
    fn clear_publishes_keyless_event() {
        let origin = Origin::in_memory();
        let a = origin.open_context();
        let mut b_events = origin.open_context().watch().unwrap();
        a.set_item("progress", "[]").unwrap();
        a.set_item("theme", "dark").unwrap();
        let _ = b_events.try_next();
        let _ = b_events.try_next();

        a.clear().unwrap();
        let Some(ChangeNotice::Changed(event)) = b_events.try_next() else {
            panic!("expected clear event");
        };
        assert!(event.key.is_none());
        assert!(origin.is_empty().unwrap());
    }

    #[test]
    fn quota_is_enforced() {
        let origin = Origin::in_memory_with_quota(16);
        let area = origin.open_context();

        area.set_item("progress", "[]").unwrap();
        let err = area.set_item("progress", "[\"conditional\"]").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 16, .. }));
        assert_eq!(area.get_item("progress").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn slow_watcher_is_told_it_missed_events() {
        let origin = Origin::in_memory();
        let a = origin.open_context();
        let mut b_events = origin.open_context().watch().unwrap();

        for i in 0..(EVENT_BUFFER + 8) {
            a.set_item("progress", &format!("[\"{i}\"]")).unwrap();
        }

        assert_eq!(
            b_events.try_next(),
            Some(ChangeNotice::Missed(EVENT_BUFFER as u64 + 8))
        );
        // the stale backlog is gone; only later writes come through
        assert!(b_events.try_next().is_none());

        a.set_item("progress", "[\"last\"]").unwrap();
        let Some(ChangeNotice::Changed(event)) = b_events.try_next() else {
            panic!("expected the write after the lag");
        };
        assert_eq!(event.new_value.as_deref(), Some("[\"last\"]"));
    }

    #[tokio::test]
    async fn writes_reach_repository_in_order() {
        let repo = InMemoryItemRepository::new();
        let origin = Origin::with_repository(Arc::new(repo.clone())).await.unwrap();
        let area = origin.open_context();

        area.set_item("progress", "[\"jsx\"]").unwrap();
        area.set_item("theme", "dark").unwrap();
        area.remove_item("theme").unwrap();
        area.set_item("progress", "[\"jsx\",\"props\"]").unwrap();
        origin.flush().await;

        let items = repo.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items["progress"], "[\"jsx\",\"props\"]");
    }

    #[tokio::test]
    async fn hydrates_from_repository() {
        let repo = InMemoryItemRepository::new();
        repo.put_item("progress", "[\"state\"]").await.unwrap();

        let origin = Origin::with_repository(Arc::new(repo)).await.unwrap();
        let area = origin.open_context();
        assert_eq!(area.get_item("progress").unwrap().as_deref(), Some("[\"state\"]"));
    }

    #[tokio::test]
    async fn next_waits_for_other_context() {
        let origin = Origin::in_memory();
        let a = origin.open_context();
        let mut b_events = origin.open_context().watch().unwrap();

        let writer = tokio::spawn(async move {
            a.set_item("progress", "[\"events\"]").unwrap();
        });
        let notice = b_events.next().await;
        writer.await.unwrap();

        let Some(ChangeNotice::Changed(event)) = notice else {
            panic!("expected change");
        };
        assert_eq!(event.new_value.as_deref(), Some("[\"events\"]"));
    }
}
