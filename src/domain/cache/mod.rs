//! Cache domain - entries, storage contract, loaders and errors

mod adapter;
mod entry;
mod error;
mod loader;
mod options;

pub use adapter::{AdapterError, StorageAdapter};
pub use entry::{CacheEntry, EntryState};
pub use error::{CacheError, CacheOperation};
pub use loader::{loader_fn, FnLoader, Loader};
pub use options::{DeleteOptions, DeleteScope, GetOptions};

#[cfg(test)]
pub use adapter::MockStorageAdapter;
