//! Key/value storage for client-local state.
//!
//! This module provides the storage abstraction that stands in for browser
//! local storage. Tree logic never touches a backend directly; it goes
//! through [`KeyValueStore`] so tests can inject an in-memory fake.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: process-local map, used in tests and one-shot runs
//! - [`FileStore`]: one file per key under a state directory, used by the CLI

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// String key → string value storage.
///
/// Values are opaque to the store; callers serialize their own data.
/// Implementations are last-write-wins across concurrent writers.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value, `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key; removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
