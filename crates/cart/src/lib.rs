//! Marketplace Cart - Persistent shopping-cart state engine.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the one authoritative [`Cart`]. Mutations apply
//!   synchronously and publish a new [`Snapshot`]; a background task loads
//!   the saved cart at startup and then persists every new version through a
//!   single writer.
//! - [`CartView`] subscribes to snapshots, derives memoized totals and
//!   forwards per-line increment/decrement actions.
//! - [`Storage`] is the key-value contract the store persists through, with
//!   in-memory and file-backed implementations.
//!
//! # Example
//!
//! ```rust,no_run
//! use marketplace_cart::{CartStore, CartView, MemoryStorage, MoneyFormat, PersistOptions};
//! use marketplace_core::{Price, ProductDescriptor};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CartStore::open(MemoryStorage::new(), PersistOptions::default()).await;
//! store.add_to_cart(ProductDescriptor::new("A", "Shirt", "a.png", Price::from_cents(1000)))?;
//!
//! let mut view = CartView::new(store.clone(), MoneyFormat::brl());
//! assert_eq!(view.totals().cart_total, "R$ 10,00");
//!
//! store.flush().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod format;
pub mod persist;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod view;

pub use cart::Cart;
pub use config::{CartConfig, ConfigError};
pub use error::{CartError, PersistError, SnapshotError, StorageError};
pub use format::{CurrencyFormatter, MoneyFormat};
pub use persist::{PersistHealth, PersistOptions, PersistStatus};
pub use snapshot::SNAPSHOT_KEY;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{CartStore, LoadOutcome, Snapshot};
pub use view::{CartItemView, CartTotals, CartView};
