use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::origin::StorageEvents;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage is unavailable in this context")]
    Unavailable,

    #[error("quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Identifies one browsing context (a tab or window) of an origin.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification that an item changed in another context of the same origin.
///
/// `key` is `None` when the whole area was cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub source: ContextId,
}

/// A string key/value area scoped to one origin.
///
/// Calls are synchronous and never block on I/O; durable backends persist in
/// the background.
pub trait StorageArea: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the area cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::QuotaExceeded` if the write would not fit, or
    /// another `StorageError` if the area cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the area cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the area cannot be written.
    fn clear(&self) -> Result<(), StorageError>;

    /// Changes made by other contexts of the same origin.
    ///
    /// Areas without cross-context notifications return `None`.
    fn watch(&self) -> Option<StorageEvents> {
        None
    }
}

/// A storage area that refuses every call, as in contexts where storage is
/// disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStorage;

impl StorageArea for UnavailableStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// Durable backing for an origin's items.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Load every persisted item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the items cannot be read.
    async fn load_items(&self) -> Result<Vec<(String, String)>, StorageError>;

    /// Persist or update an item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be stored.
    async fn put_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete an item. Deleting a missing item is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be deleted.
    async fn delete_item(&self, key: &str) -> Result<(), StorageError>;

    /// Delete every item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the items cannot be deleted.
    async fn clear_items(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryItemRepository {
    items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemoryItemRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the persisted items, for assertions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn items(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn load_items(&self) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self.items()?.into_iter().collect())
    }

    async fn put_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }

    async fn clear_items(&self) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_storage_refuses_everything() {
        let area = UnavailableStorage;
        assert_eq!(area.get_item("progress"), Err(StorageError::Unavailable));
        assert_eq!(area.set_item("progress", "[]"), Err(StorageError::Unavailable));
        assert_eq!(area.remove_item("progress"), Err(StorageError::Unavailable));
        assert_eq!(area.clear(), Err(StorageError::Unavailable));
        assert!(area.watch().is_none());
    }

    #[test]
    fn context_ids_are_unique() {
        assert_ne!(ContextId::new(), ContextId::new());
    }

    #[tokio::test]
    async fn in_memory_repository_round_trips() {
        let repo = InMemoryItemRepository::new();
        repo.put_item("progress", "[\"jsx\"]").await.unwrap();
        repo.put_item("theme", "dark").await.unwrap();
        repo.delete_item("theme").await.unwrap();
        repo.delete_item("missing").await.unwrap();

        let items = repo.load_items().await.unwrap();
        assert_eq!(items, vec![("progress".to_owned(), "[\"jsx\"]".to_owned())]);

        repo.clear_items().await.unwrap();
        assert!(repo.load_items().await.unwrap().is_empty());
    }
}
