//! Persisted cart layout.
//!
//! The stored value is a bare JSON array of line items with no envelope,
//! version tag or checksum:
//!
//! ```json
//! [{"id":"A","title":"Shirt","image_url":"https://...","price":10.00,"quantity":2}]
//! ```

use marketplace_core::LineItem;

use crate::cart::Cart;
use crate::error::SnapshotError;

/// Storage key the cart is persisted under.
pub const SNAPSHOT_KEY: &str = "cart-snapshot";

/// Serialize lines for storage.
///
/// # Errors
///
/// Returns [`SnapshotError::Encode`] if serialization fails.
pub fn encode(lines: &[LineItem]) -> Result<Vec<u8>, SnapshotError> {
    serde_json::to_vec(lines).map_err(SnapshotError::Encode)
}

/// Parse stored bytes back into a cart.
///
/// # Errors
///
/// Returns [`SnapshotError::Decode`] for malformed JSON or lines that violate
/// the line item rules (such as a zero quantity),
/// [`SnapshotError::DuplicateId`] if a product appears twice, and
/// [`SnapshotError::TotalOverflow`] if the lines cannot be totalled.
pub fn decode(bytes: &[u8]) -> Result<Cart, SnapshotError> {
    let lines: Vec<LineItem> = serde_json::from_slice(bytes).map_err(SnapshotError::Decode)?;
    Cart::from_lines(lines)
}
