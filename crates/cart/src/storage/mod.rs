//! Key-value storage engine contract and backends.
//!
//! The cart treats storage as an opaque byte store: one `get` and one `set`
//! per key, nothing else. Backends:
//!
//! - [`MemoryStorage`] - process-local map, clones share data
//! - [`FileStorage`] - one file per key under a directory

use std::future::Future;

use crate::error::StorageError;

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// A durable key-value byte store.
pub trait Storage: Send + Sync + 'static {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>)
    -> impl Future<Output = Result<(), StorageError>> + Send;
}
