//! The authoritative cart and its startup/persistence protocol.
//!
//! # Lifecycle
//!
//! 1. [`CartStore::new`] returns at once with an empty snapshot and spawns a
//!    background task.
//! 2. The task reads the saved cart exactly once and publishes it. Until then
//!    every mutation fails with [`CartError::Loading`], so an early write can
//!    never be overwritten by the load.
//! 3. The same task then becomes the single writer for this store
//!    (see [`crate::persist`]).
//!
//! [`CartStore::open`] combines steps 1 and 2 for callers that would rather
//! wait than handle `Loading`.

use std::sync::{Arc, Weak};

use marketplace_core::{LineItem, ProductDescriptor, ProductId};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::cart::Cart;
use crate::error::{CartError, PersistError};
use crate::persist::{self, PersistHealth, PersistOptions, PersistStatus};
use crate::snapshot::{self, SNAPSHOT_KEY};
use crate::storage::Storage;

/// Version of the snapshot published by the initial load.
const LOADED_VERSION: u64 = 1;

/// Read-only view of the cart at one version.
///
/// Cloning is cheap; the lines are shared.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    version: u64,
    cart: Arc<Cart>,
}

impl Snapshot {
    pub(crate) fn new(version: u64, cart: Cart) -> Self {
        Self {
            version,
            cart: Arc::new(cart),
        }
    }

    /// Monotonic version: 0 before the load, 1 after it, +1 per mutation.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[LineItem] {
        self.cart.lines()
    }

    /// The cart value.
    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }
}

/// What the startup load found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load has not finished.
    Pending,
    /// A saved cart was restored.
    Restored {
        /// Number of lines restored.
        lines: usize,
    },
    /// Nothing was saved.
    Absent,
    /// The saved value could not be decoded; starting empty.
    Corrupt {
        /// Decode error.
        error: String,
    },
    /// Storage could not be read; starting empty.
    Failed {
        /// Storage error.
        error: String,
    },
}

impl LoadOutcome {
    /// Whether the load is still running.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Handle to the single authoritative cart.
///
/// Cheap to clone; clones share the same cart. Pass it to whatever needs to
/// read or mutate the cart instead of reaching for global state.
#[derive(Debug, Clone)]
pub struct CartStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    state: watch::Sender<Snapshot>,
    load: watch::Sender<LoadOutcome>,
    persist: watch::Receiver<PersistStatus>,
}

impl CartStore {
    /// Create a store and start loading the saved cart in the background.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new<S: Storage>(storage: S, options: PersistOptions) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        let (load, _) = watch::channel(LoadOutcome::Pending);
        let (persist_tx, persist_rx) = watch::channel(PersistStatus::default());

        let inner = Arc::new(StoreInner {
            state,
            load,
            persist: persist_rx,
        });

        tokio::spawn(load_then_persist(
            Arc::new(storage),
            Arc::downgrade(&inner),
            persist_tx,
            options,
        ));

        Self { inner }
    }

    /// Create a store and wait for the saved cart to load.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub async fn open<S: Storage>(storage: S, options: PersistOptions) -> Self {
        let store = Self::new(storage, options);
        store.ready().await;
        store
    }

    /// Wait for the startup load to finish.
    pub async fn ready(&self) -> LoadOutcome {
        let mut rx = self.inner.load.subscribe();
        match rx.wait_for(|outcome| !outcome.is_pending()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => self.load_outcome(),
        }
    }

    /// What the startup load found so far.
    #[must_use]
    pub fn load_outcome(&self) -> LoadOutcome {
        self.inner.load.borrow().clone()
    }

    /// Current cart.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.state.subscribe()
    }

    /// Add one unit of `product`, appending it if new.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Loading`] before the saved cart has loaded,
    /// [`CartError::QuantityOverflow`] if the line is already at its maximum,
    /// or [`CartError::TotalOverflow`] if the cart total would overflow.
    pub fn add_to_cart(&self, product: ProductDescriptor) -> Result<(), CartError> {
        let id = product.id.clone();
        let ((), version) = self.mutate(|cart| cart.add(product))?;
        debug!(product_id = %id, version, "Added to cart");
        Ok(())
    }

    /// Raise the quantity of an existing line by one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Loading`] before the saved cart has loaded,
    /// [`CartError::NotFound`] if `id` is not in the cart,
    /// [`CartError::QuantityOverflow`] if the line is already at its maximum,
    /// or [`CartError::TotalOverflow`] if the cart total would overflow.
    pub fn increment(&self, id: &ProductId) -> Result<(), CartError> {
        let ((), version) = self.mutate(|cart| cart.increment(id))?;
        debug!(product_id = %id, version, "Incremented cart line");
        Ok(())
    }

    /// Lower the quantity of an existing line by one, removing it at zero.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Loading`] before the saved cart has loaded,
    /// [`CartError::NotFound`] if `id` is not in the cart, or
    /// [`CartError::TotalOverflow`] if removing a negative-priced unit would
    /// overflow the total.
    pub fn decrement(&self, id: &ProductId) -> Result<(), CartError> {
        let (remaining, version) = self.mutate(|cart| cart.decrement(id))?;
        match remaining {
            Some(quantity) => debug!(product_id = %id, version, quantity, "Decremented cart line"),
            None => debug!(product_id = %id, version, "Removed cart line"),
        }
        Ok(())
    }

    /// Persistence health, updated after every finished write.
    #[must_use]
    pub fn persistence(&self) -> watch::Receiver<PersistStatus> {
        self.inner.persist.clone()
    }

    /// Wait until the current cart version has been written.
    ///
    /// Succeeds immediately if nothing has changed since the load.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Write`] if the write covering this version
    /// failed, or [`PersistError::Closed`] if the writer task is gone.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let target = self.inner.state.borrow().version();
        let mut rx = self.inner.persist.clone();
        let status = rx
            .wait_for(|status| status.version >= target)
            .await
            .map_err(|_| PersistError::Closed)?
            .clone();

        match status.health {
            PersistHealth::Degraded { error } => Err(PersistError::Write {
                version: status.version,
                message: error,
            }),
            PersistHealth::Idle | PersistHealth::Healthy => Ok(()),
        }
    }

    /// Apply `op` to a copy of the cart and publish it as the next version.
    ///
    /// Runs under the snapshot channel's lock, so concurrent mutations never
    /// interleave. Nothing is published when `op` fails.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Cart) -> Result<T, CartError>,
    ) -> Result<(T, u64), CartError> {
        if self.inner.load.borrow().is_pending() {
            return Err(CartError::Loading);
        }

        let mut result = Err(CartError::Loading);
        self.inner.state.send_if_modified(|current| {
            let mut cart = current.cart().clone();
            match op(&mut cart) {
                Ok(value) => {
                    let version = current.version + 1;
                    *current = Snapshot::new(version, cart);
                    result = Ok((value, version));
                    true
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });
        result
    }
}

impl StoreInner {
    /// Publish the loaded cart and hand back a receiver for the writer.
    ///
    /// The receiver is created before mutations are unblocked so it sees
    /// every one of them.
    fn finish_load(&self, cart: Cart, outcome: LoadOutcome) -> watch::Receiver<Snapshot> {
        self.state.send_replace(Snapshot::new(LOADED_VERSION, cart));
        let snapshots = self.state.subscribe();
        self.load.send_replace(outcome);
        snapshots
    }
}

async fn load_then_persist<S: Storage>(
    storage: Arc<S>,
    inner: Weak<StoreInner>,
    status: watch::Sender<PersistStatus>,
    options: PersistOptions,
) {
    let (cart, outcome) = load(storage.as_ref()).await;

    let snapshots = {
        let Some(inner) = inner.upgrade() else {
            debug!("Cart store dropped before load finished");
            return;
        };
        inner.finish_load(cart, outcome)
    };

    status.send_replace(PersistStatus {
        version: LOADED_VERSION,
        health: PersistHealth::Idle,
    });

    persist::run_writer(storage, snapshots, status, options).await;
}

#[instrument(skip_all)]
async fn load<S: Storage>(storage: &S) -> (Cart, LoadOutcome) {
    match storage.get(SNAPSHOT_KEY).await {
        Ok(None) => {
            info!("No saved cart, starting empty");
            (Cart::new(), LoadOutcome::Absent)
        }
        Ok(Some(bytes)) => match snapshot::decode(&bytes) {
            Ok(cart) => {
                let lines = cart.len();
                info!(lines, "Restored saved cart");
                (cart, LoadOutcome::Restored { lines })
            }
            Err(e) => {
                warn!(error = %e, "Saved cart is corrupt, starting empty");
                (
                    Cart::new(),
                    LoadOutcome::Corrupt {
                        error: e.to_string(),
                    },
                )
            }
        },
        Err(e) => {
            error!(error = %e, "Failed to read saved cart, starting empty");
            (
                Cart::new(),
                LoadOutcome::Failed {
                    error: e.to_string(),
                },
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use marketplace_core::Price;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStorage;

    /// Blocks reads until a permit is released.
    struct GatedStorage {
        inner: MemoryStorage,
        gate: Arc<Semaphore>,
    }

    impl Storage for GatedStorage {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
            self.inner.set(key, value).await
        }
    }

    /// Reads fail, writes always fail.
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Err(StorageError::Unavailable("offline".into()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("offline".into()))
        }
    }

    fn product(id: &str, cents: i64) -> ProductDescriptor {
        ProductDescriptor::new(id, format!("Product {id}"), "", Price::from_cents(cents))
    }

    fn quantities(store: &CartStore) -> Vec<(String, u32)> {
        store
            .snapshot()
            .lines()
            .iter()
            .map(|line| (line.id.to_string(), line.quantity.get()))
            .collect()
    }

    fn fast() -> PersistOptions {
        PersistOptions {
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_open_empty_storage() {
        let store = CartStore::open(MemoryStorage::new(), fast()).await;
        assert_eq!(store.load_outcome(), LoadOutcome::Absent);
        assert!(store.snapshot().lines().is_empty());
        assert_eq!(store.snapshot().version(), LOADED_VERSION);
    }

    #[tokio::test]
    async fn test_mutations_rejected_while_loading() {
        let gate = Arc::new(Semaphore::new(0));
        let storage = GatedStorage {
            inner: MemoryStorage::with_entry(
                SNAPSHOT_KEY,
                r#"[{"id":"A","title":"Shirt","image_url":"","price":10,"quantity":2}]"#,
            ),
            gate: Arc::clone(&gate),
        };
        let store = CartStore::new(storage, fast());

        assert!(store.snapshot().lines().is_empty());
        assert!(store.load_outcome().is_pending());
        assert_eq!(store.add_to_cart(product("B", 500)), Err(CartError::Loading));
        assert_eq!(store.increment(&ProductId::new("A")), Err(CartError::Loading));

        gate.add_permits(1);
        assert_eq!(store.ready().await, LoadOutcome::Restored { lines: 1 });

        store.add_to_cart(product("B", 500)).unwrap();
        assert_eq!(
            quantities(&store),
            [("A".to_string(), 2), ("B".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_mutation_is_persisted() {
        let storage = MemoryStorage::new();
        let store = CartStore::open(storage.clone(), fast()).await;

        store.add_to_cart(product("A", 1000)).unwrap();
        store.add_to_cart(product("A", 1000)).unwrap();
        store.flush().await.unwrap();

        let saved = storage.peek(SNAPSHOT_KEY).unwrap().unwrap();
        let cart = snapshot::decode(&saved).unwrap();
        assert_eq!(cart.lines(), store.snapshot().lines());
    }

    #[tokio::test]
    async fn test_reopen_restores_cart() {
        let storage = MemoryStorage::new();
        {
            let store = CartStore::open(storage.clone(), fast()).await;
            store.add_to_cart(product("A", 1000)).unwrap();
            store.add_to_cart(product("B", 500)).unwrap();
            store.increment(&ProductId::new("B")).unwrap();
            store.flush().await.unwrap();
        }

        let store = CartStore::open(storage, fast()).await;
        assert_eq!(store.load_outcome(), LoadOutcome::Restored { lines: 2 });
        assert_eq!(
            quantities(&store),
            [("A".to_string(), 1), ("B".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let storage = MemoryStorage::with_entry(SNAPSHOT_KEY, "not json");
        let store = CartStore::open(storage.clone(), fast()).await;

        assert!(matches!(store.load_outcome(), LoadOutcome::Corrupt { .. }));
        assert!(store.snapshot().lines().is_empty());

        store.add_to_cart(product("A", 1000)).unwrap();
        store.flush().await.unwrap();
        assert!(snapshot::decode(&storage.peek(SNAPSHOT_KEY).unwrap().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_storage_starts_empty() {
        let store = CartStore::open(BrokenStorage, fast()).await;
        assert!(matches!(store.load_outcome(), LoadOutcome::Failed { .. }));
        assert!(store.snapshot().lines().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_on_flush_not_mutation() {
        let store = CartStore::open(BrokenStorage, fast()).await;

        store.add_to_cart(product("A", 1000)).unwrap();
        assert_eq!(quantities(&store), [("A".to_string(), 1)]);

        let err = store.flush().await.unwrap_err();
        assert!(matches!(err, PersistError::Write { version: 2, .. }));
        assert!(store.persistence().borrow().is_degraded());
    }

    #[tokio::test]
    async fn test_flush_without_changes() {
        let store = CartStore::open(MemoryStorage::new(), fast()).await;
        store.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found_does_not_bump_version() {
        let store = CartStore::open(MemoryStorage::new(), fast()).await;
        store.add_to_cart(product("A", 1000)).unwrap();
        let before = store.snapshot().version();

        let err = store.decrement(&ProductId::new("missing")).unwrap_err();

        assert_eq!(err, CartError::NotFound(ProductId::new("missing")));
        assert_eq!(store.snapshot().version(), before);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_version() {
        let store = CartStore::open(MemoryStorage::new(), fast()).await;
        let mut rx = store.subscribe();

        store.add_to_cart(product("A", 1000)).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().version(), LOADED_VERSION + 1);

        store.decrement(&ProductId::new("A")).unwrap();
        assert!(rx.borrow_and_update().lines().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_cart() {
        let store = CartStore::open(MemoryStorage::new(), fast()).await;
        let other = store.clone();

        other.add_to_cart(product("A", 1000)).unwrap();

        assert_eq!(quantities(&store), [("A".to_string(), 1)]);
    }
}
