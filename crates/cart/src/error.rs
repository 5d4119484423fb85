//! Error types for the cart engine.
//!
//! Each concern gets its own enum: cart mutations, the storage engine, the
//! snapshot codec and the persistence writer. Load failures never surface as
//! errors; the store reports them through [`crate::LoadOutcome`].

use marketplace_core::ProductId;
use thiserror::Error;

/// A cart mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The persisted cart has not been loaded yet.
    #[error("cart is still loading")]
    Loading,

    /// No line in the cart has this product id.
    #[error("product not in cart: {0}")]
    NotFound(ProductId),

    /// The line is already at the maximum representable quantity.
    #[error("quantity overflow for product: {0}")]
    QuantityOverflow(ProductId),

    /// The change would push the cart total past the decimal range.
    #[error("cart total overflow when changing product: {0}")]
    TotalOverflow(ProductId),
}

/// The key-value storage engine failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error for key {key}: {source}")]
    Io {
        /// Storage key being read or written.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The storage engine refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A persisted snapshot could not be encoded or decoded.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Serializing the cart failed.
    #[error("failed to encode cart snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// The stored bytes are not a valid cart.
    #[error("failed to decode cart snapshot: {0}")]
    Decode(#[source] serde_json::Error),

    /// The stored cart lists the same product twice.
    #[error("duplicate product in cart snapshot: {0}")]
    DuplicateId(ProductId),

    /// The stored lines add up to more than a decimal can hold.
    #[error("cart snapshot total overflows")]
    TotalOverflow,
}

/// Writing the cart to storage failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// All write attempts for this version failed.
    #[error("failed to persist cart version {version}: {message}")]
    Write {
        /// Cart version whose write failed.
        version: u64,
        /// Last error reported by the storage engine.
        message: String,
    },

    /// The writer task is gone.
    #[error("persistence writer stopped")]
    Closed,
}
