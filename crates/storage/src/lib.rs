#![forbid(unsafe_code)]

pub mod origin;
pub mod repository;
pub mod sqlite;

pub use origin::{ChangeNotice, DEFAULT_QUOTA_BYTES, Origin, OriginStorage, StorageEvents};
pub use repository::{
    ContextId, InMemoryItemRepository, ItemRepository, StorageArea, StorageError, StorageEvent,
    UnavailableStorage,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
