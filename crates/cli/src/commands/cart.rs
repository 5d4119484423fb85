//! Cart commands against the file-backed store.
//!
//! # Environment Variables
//!
//! - `CART_STORAGE_DIR` - Directory holding `cart-snapshot.json`
//! - `CART_CURRENCY` - Currency used when printing prices

use marketplace_cart::{
    CartConfig, CartError, CartStore, CartView, FileStorage, LoadOutcome, MoneyFormat,
};
use marketplace_core::{Price, ProductDescriptor, ProductId};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Open the store configured by `config` and wait for the saved cart.
pub async fn open(config: &CartConfig) -> CartStore {
    let storage = FileStorage::new(&config.storage_dir);
    info!(path = %storage.dir().display(), "Opening cart");

    let store = CartStore::open(storage, config.persist).await;
    if let LoadOutcome::Corrupt { error } = store.load_outcome() {
        warn!("Saved cart was unreadable and will be replaced: {error}");
    }
    store
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns an error if the line is already at its maximum quantity.
pub fn add(
    store: &CartStore,
    id: String,
    title: String,
    image_url: String,
    price: Decimal,
) -> Result<(), CartError> {
    let product = ProductDescriptor::new(id, title, image_url, Price::new(price));
    info!(product_id = %product.id, "Adding to cart");
    store.add_to_cart(product)
}

/// Add one unit to an existing line.
///
/// # Errors
///
/// Returns an error if the product is not in the cart.
pub fn increment(store: &CartStore, id: &str) -> Result<(), CartError> {
    store.increment(&ProductId::new(id))
}

/// Remove one unit from an existing line.
///
/// # Errors
///
/// Returns an error if the product is not in the cart.
pub fn decrement(store: &CartStore, id: &str) -> Result<(), CartError> {
    store.decrement(&ProductId::new(id))
}

/// Log every line and the totals.
pub fn show(store: &CartStore, currency: MoneyFormat) {
    let mut view = CartView::new(store.clone(), currency);
    let items = view.items();

    if items.is_empty() {
        info!("Cart is empty");
    }
    for item in &items {
        info!(
            "  [{}] {} - {}x {} = {}",
            item.id, item.title, item.quantity, item.price, item.line_price
        );
    }

    let totals = view.totals();
    info!("{} items, total {}", totals.total_item_count, totals.cart_total);
}
