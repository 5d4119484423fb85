//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are currency-agnostic: the cart never converts between currencies,
//! it only multiplies and sums. Formatting for display lives with the
//! presentation layer.

use core::fmt;
use core::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A unit price.
///
/// Serialized as a plain JSON number so persisted carts stay readable by
/// other tools. The number keeps every digit of the decimal; it never passes
/// through `f64`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Price(#[serde(with = "rust_decimal::serde::arbitrary_precision")] Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in hundredths (e.g., cents).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, or `None` if it does not fit in a
    /// [`Decimal`].
    #[must_use]
    pub fn times(&self, quantity: NonZeroU32) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity.get()))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
