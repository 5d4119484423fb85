//! Cart line items and the product descriptors they are created from.

use core::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product as offered by the catalog, before it is placed in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    /// Opaque external product identifier.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Product image location.
    pub image_url: String,
    /// Unit price.
    pub price: Price,
}

impl ProductDescriptor {
    /// Create a new product descriptor.
    #[must_use]
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: Price,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }
}

/// One product entry in a cart together with its quantity.
///
/// `quantity` is a [`NonZeroU32`]: a line at quantity zero cannot be
/// constructed or deserialized, it has to be removed instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Opaque external product identifier, unique within a cart.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Product image location.
    pub image_url: String,
    /// Unit price.
    pub price: Price,
    /// Number of units, always at least one.
    pub quantity: NonZeroU32,
}

impl LineItem {
    /// Start a new line with a single unit of `product`.
    #[must_use]
    pub fn from_descriptor(product: ProductDescriptor) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image_url: product.image_url,
            price: product.price,
            quantity: NonZeroU32::MIN,
        }
    }

    /// Unit price times quantity, or `None` on decimal overflow.
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.times(self.quantity)
    }
}
