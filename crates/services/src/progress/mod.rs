mod observers;
mod store;
mod sync;

// Public API of the progress subsystem.
pub use observers::Subscription;
pub use store::{PROGRESS_STORAGE_KEY, ProgressStore};
