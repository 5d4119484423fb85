//! Integration tests for the marketplace cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenario` - End-to-end behavior of the store and view
//! - `cart_persistence` - Restarts, write ordering and storage failures
//! - `cart_invariants` - Randomized operation sequences
//!
//! This library holds the shared fixtures: product builders, a temporary
//! directory guard and instrumented storage backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use marketplace_cart::{MemoryStorage, Storage, StorageError};
use marketplace_core::{Price, ProductDescriptor};

/// Product fixture with a price in cents.
#[must_use]
pub fn product(id: &str, cents: i64) -> ProductDescriptor {
    ProductDescriptor::new(
        id,
        format!("Product {id}"),
        format!("https://img.example/{id}.png"),
        Price::from_cents(cents),
    )
}

/// A uniquely named directory under the system temp dir, removed on drop.
#[derive(Debug)]
pub struct TempDir(PathBuf);

impl TempDir {
    /// Reserve a fresh path. The directory itself is created lazily.
    #[must_use]
    pub fn new() -> Self {
        Self(std::env::temp_dir().join(format!("marketplace-cart-{}", uuid::Uuid::new_v4())))
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Default for TempDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Memory storage that records every completed write and can be slowed down
/// or switched into a failing mode.
#[derive(Clone, Default)]
pub struct InstrumentedStorage {
    inner: MemoryStorage,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    write_delay: Option<Duration>,
    failing: Arc<AtomicBool>,
}

impl InstrumentedStorage {
    /// Storage with instant writes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose writes each take `delay`.
    #[must_use]
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every successful write, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Underlying memory storage, shared with this handle.
    #[must_use]
    pub fn memory(&self) -> &MemoryStorage {
        &self.inner
    }
}

impl Storage for InstrumentedStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("write rejected".into()));
        }

        self.inner.set(key, value.clone()).await?;
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(value);
        }
        Ok(())
    }
}
