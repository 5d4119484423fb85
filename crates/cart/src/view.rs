//! Derived, display-ready data for a cart screen.
//!
//! [`CartView`] only reads snapshots and forwards the per-line increment and
//! decrement actions; it never adds products.

use marketplace_core::{LineItem, ProductId};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::debug;

use crate::cart::Cart;
use crate::error::CartError;
use crate::format::{CurrencyFormatter, MoneyFormat};
use crate::store::{CartStore, Snapshot};

/// Aggregates shown in the cart footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTotals {
    /// Sum of `price * quantity`.
    pub subtotal: Decimal,
    /// `subtotal`, formatted.
    pub cart_total: String,
    /// Sum of quantities.
    pub total_item_count: u64,
}

/// One cart row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    /// Product the row belongs to.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Product image location.
    pub image_url: String,
    /// Units in the cart.
    pub quantity: u32,
    /// Unit price, formatted.
    pub price: String,
    /// Unit price times quantity, formatted.
    pub line_price: String,
}

impl CartItemView {
    fn from_line(line: &LineItem, formatter: &impl CurrencyFormatter) -> Self {
        Self {
            id: line.id.clone(),
            title: line.title.clone(),
            image_url: line.image_url.clone(),
            quantity: line.quantity.get(),
            price: formatter.format_value(line.price.amount()),
            line_price: line
                .subtotal()
                .map_or_else(String::new, |value| formatter.format_value(value)),
        }
    }
}

#[derive(Debug)]
struct Memo {
    version: u64,
    totals: CartTotals,
}

/// Read-only consumer of a [`CartStore`].
///
/// Totals are memoized per snapshot version and recomputed only when the
/// store publishes a new one.
#[derive(Debug)]
pub struct CartView<F = MoneyFormat> {
    store: CartStore,
    snapshots: watch::Receiver<Snapshot>,
    formatter: F,
    memo: Option<Memo>,
    recomputations: u64,
}

impl<F: CurrencyFormatter> CartView<F> {
    /// Create a view over `store`.
    #[must_use]
    pub fn new(store: CartStore, formatter: F) -> Self {
        let snapshots = store.subscribe();
        Self {
            store,
            snapshots,
            formatter,
            memo: None,
            recomputations: 0,
        }
    }

    /// Latest snapshot.
    pub fn snapshot(&mut self) -> Snapshot {
        self.snapshots.borrow_and_update().clone()
    }

    /// Cart total and item count for the latest snapshot.
    pub fn totals(&mut self) -> &CartTotals {
        let snapshot = self.snapshot();
        let version = snapshot.version();

        let memo = self
            .memo
            .take()
            .filter(|memo| memo.version == version)
            .unwrap_or_else(|| {
                self.recomputations += 1;
                Memo {
                    version,
                    totals: compute_totals(snapshot.cart(), &self.formatter),
                }
            });

        &self.memo.insert(memo).totals
    }

    /// Display rows for the latest snapshot, in cart order.
    pub fn items(&mut self) -> Vec<CartItemView> {
        let snapshot = self.snapshot();
        snapshot
            .lines()
            .iter()
            .map(|line| CartItemView::from_line(line, &self.formatter))
            .collect()
    }

    /// How many times totals have been computed.
    #[must_use]
    pub const fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Handle the "+" action on a row.
    ///
    /// A product that is no longer in the cart is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Loading`], [`CartError::QuantityOverflow`] or
    /// [`CartError::TotalOverflow`] from the store.
    pub fn increment(&self, id: &ProductId) -> Result<(), CartError> {
        ignore_missing(self.store.increment(id))
    }

    /// Handle the "-" action on a row.
    ///
    /// A product that is no longer in the cart is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Loading`] or [`CartError::TotalOverflow`] from
    /// the store.
    pub fn decrement(&self, id: &ProductId) -> Result<(), CartError> {
        ignore_missing(self.store.decrement(id))
    }
}

fn ignore_missing(result: Result<(), CartError>) -> Result<(), CartError> {
    match result {
        Err(CartError::NotFound(id)) => {
            debug!(product_id = %id, "Ignoring action for product not in cart");
            Ok(())
        }
        other => other,
    }
}

fn compute_totals(cart: &Cart, formatter: &impl CurrencyFormatter) -> CartTotals {
    let subtotal = cart.total();
    CartTotals {
        subtotal,
        cart_total: formatter.format_value(subtotal),
        total_item_count: cart.item_count(),
    }
}
