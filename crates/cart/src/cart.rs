//! Cart merge and quantity rules.
//!
//! [`Cart`] is a plain value: no locking, no I/O. The store wraps it to add
//! snapshots and persistence.

use std::collections::HashSet;
use std::num::NonZeroU32;

use marketplace_core::{LineItem, ProductDescriptor, ProductId};
use rust_decimal::Decimal;

use crate::error::{CartError, SnapshotError};

/// Ordered collection of line items, unique by product id.
///
/// Lines keep insertion order. Mutating an existing product never moves it.
/// The total is kept alongside the lines; a change that would push any line
/// subtotal or the total past [`Decimal::MAX`] is refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<LineItem>,
    total: Decimal,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Rebuild a cart from previously persisted lines.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DuplicateId`] if two lines share a product id,
    /// or [`SnapshotError::TotalOverflow`] if the lines cannot be totalled.
    pub fn from_lines(lines: Vec<LineItem>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            if !seen.insert(&line.id) {
                return Err(SnapshotError::DuplicateId(line.id.clone()));
            }
        }
        let total = total(&lines).ok_or(SnapshotError::TotalOverflow)?;
        Ok(Self { lines, total })
    }

    /// Add one unit of `product`.
    ///
    /// A new product is appended with quantity 1; a product already in the
    /// cart has its quantity raised by one in place.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the existing line is already
    /// at `u32::MAX`, or [`CartError::TotalOverflow`] if the cart total would
    /// no longer fit.
    pub fn add(&mut self, product: ProductDescriptor) -> Result<(), CartError> {
        if self.position(&product.id).is_some() {
            return self.increment(&product.id);
        }
        let id = product.id.clone();
        self.apply(&id, |lines| {
            lines.push(LineItem::from_descriptor(product));
            Ok(())
        })
    }

    /// Raise the quantity of an existing line by one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if no line has `id`,
    /// [`CartError::QuantityOverflow`] if the line is already at `u32::MAX`,
    /// or [`CartError::TotalOverflow`] if the cart total would no longer fit.
    pub fn increment(&mut self, id: &ProductId) -> Result<(), CartError> {
        self.apply(id, |lines| {
            let line = lines
                .iter_mut()
                .find(|line| &line.id == id)
                .ok_or_else(|| CartError::NotFound(id.clone()))?;

            line.quantity = line
                .quantity
                .checked_add(1)
                .ok_or_else(|| CartError::QuantityOverflow(id.clone()))?;
            Ok(())
        })
    }

    /// Lower the quantity of an existing line by one, removing it at zero.
    ///
    /// Returns the remaining quantity, or `None` if the line was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if no line has `id`. This includes a
    /// line that an earlier decrement already removed. With negative prices
    /// in the cart, [`CartError::TotalOverflow`] is also possible.
    pub fn decrement(&mut self, id: &ProductId) -> Result<Option<u32>, CartError> {
        self.apply(id, |lines| {
            let index = lines
                .iter()
                .position(|line| &line.id == id)
                .ok_or_else(|| CartError::NotFound(id.clone()))?;

            let remaining = lines
                .get(index)
                .and_then(|line| NonZeroU32::new(line.quantity.get() - 1));

            match remaining {
                Some(quantity) => {
                    if let Some(line) = lines.get_mut(index) {
                        line.quantity = quantity;
                    }
                    Ok(Some(quantity.get()))
                }
                None => {
                    lines.remove(index);
                    Ok(None)
                }
            }
        })
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Look up the line for `id`.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.lines.iter().find(|line| &line.id == id)
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        item_count(&self.lines)
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|line| &line.id == id)
    }

    /// Run `op` on a copy of the lines and keep the result only if it can
    /// still be totalled.
    fn apply<T>(
        &mut self,
        id: &ProductId,
        op: impl FnOnce(&mut Vec<LineItem>) -> Result<T, CartError>,
    ) -> Result<T, CartError> {
        let mut lines = self.lines.clone();
        let value = op(&mut lines)?;
        let total = total(&lines).ok_or_else(|| CartError::TotalOverflow(id.clone()))?;

        self.lines = lines;
        self.total = total;
        Ok(value)
    }
}

/// Sum of `price * quantity` over `lines`, or `None` if a line subtotal or
/// the sum overflows.
#[must_use]
pub fn total(lines: &[LineItem]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.subtotal()?))
}

/// Sum of quantities over `lines`.
#[must_use]
pub fn item_count(lines: &[LineItem]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity.get())).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use marketplace_core::Price;

    use super::*;

    fn product(id: &str, cents: i64) -> ProductDescriptor {
        ProductDescriptor::new(id, format!("Product {id}"), "", Price::from_cents(cents))
    }

    fn ids(cart: &Cart) -> Vec<&str> {
        cart.lines().iter().map(|line| line.id.as_str()).collect()
    }

    fn qty(cart: &Cart, id: &str) -> u32 {
        cart.get(&ProductId::new(id)).unwrap().quantity.get()
    }

    #[test]
    fn test_add_new_product_appends() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        cart.add(product("B", 500)).unwrap();

        assert_eq!(ids(&cart), ["A", "B"]);
        assert_eq!(qty(&cart, "B"), 1);
    }

    #[test]
    fn test_add_existing_product_increments_in_place() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        cart.add(product("B", 500)).unwrap();
        cart.add(product("A", 1000)).unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(ids(&cart), ["A", "B"]);
        assert_eq!(qty(&cart, "A"), 2);
    }

    #[test]
    fn test_increment_leaves_other_lines_alone() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        cart.add(product("B", 500)).unwrap();
        let before_b = cart.get(&ProductId::new("B")).cloned();

        cart.increment(&ProductId::new("A")).unwrap();

        assert_eq!(qty(&cart, "A"), 2);
        assert_eq!(cart.get(&ProductId::new("B")).cloned(), before_b);
        assert_eq!(ids(&cart), ["A", "B"]);
    }

    #[test]
    fn test_increment_missing_is_not_found() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        let before = cart.clone();

        let err = cart.increment(&ProductId::new("Z")).unwrap_err();

        assert_eq!(err, CartError::NotFound(ProductId::new("Z")));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_decrement_above_one_keeps_position() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        cart.add(product("B", 500)).unwrap();
        cart.increment(&ProductId::new("A")).unwrap();

        let remaining = cart.decrement(&ProductId::new("A")).unwrap();

        assert_eq!(remaining, Some(1));
        assert_eq!(ids(&cart), ["A", "B"]);
    }

    #[test]
    fn test_decrement_at_one_removes_line() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        cart.add(product("B", 500)).unwrap();
        cart.add(product("C", 200)).unwrap();

        let remaining = cart.decrement(&ProductId::new("B")).unwrap();

        assert_eq!(remaining, None);
        assert_eq!(ids(&cart), ["A", "C"]);
    }

    #[test]
    fn test_double_decrement_is_not_found() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        cart.decrement(&ProductId::new("A")).unwrap();

        let err = cart.decrement(&ProductId::new("A")).unwrap_err();

        assert!(matches!(err, CartError::NotFound(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_increment_overflow() {
        let mut line = LineItem::from_descriptor(product("A", 100));
        line.quantity = NonZeroU32::MAX;
        let mut cart = Cart::from_lines(vec![line]).unwrap();

        let err = cart.increment(&ProductId::new("A")).unwrap_err();

        assert_eq!(err, CartError::QuantityOverflow(ProductId::new("A")));
        assert_eq!(cart.lines()[0].quantity, NonZeroU32::MAX);
    }

    #[test]
    fn test_from_lines_rejects_duplicates() {
        let a = LineItem::from_descriptor(product("A", 100));
        let result = Cart::from_lines(vec![a.clone(), a]);
        assert!(matches!(result, Err(SnapshotError::DuplicateId(_))));
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        cart.add(product("A", 1000)).unwrap();
        cart.add(product("A", 1000)).unwrap();
        cart.add(product("B", 550)).unwrap();

        assert_eq!(cart.total(), Decimal::new(2550, 2));
        assert_eq!(cart.item_count(), 3);
    }

    fn max_priced(id: &str) -> ProductDescriptor {
        ProductDescriptor::new(id, "Yacht", "", Price::new(Decimal::MAX))
    }

    #[test]
    fn test_increment_past_decimal_range_is_refused() {
        let mut cart = Cart::new();
        cart.add(max_priced("A")).unwrap();
        let before = cart.clone();

        let err = cart.increment(&ProductId::new("A")).unwrap_err();

        assert_eq!(err, CartError::TotalOverflow(ProductId::new("A")));
        assert_eq!(cart, before);
        assert_eq!(cart.total(), Decimal::MAX);
    }

    #[test]
    fn test_add_past_decimal_range_is_refused() {
        let mut cart = Cart::new();
        cart.add(max_priced("A")).unwrap();

        assert_eq!(
            cart.add(max_priced("A")),
            Err(CartError::TotalOverflow(ProductId::new("A")))
        );
        assert_eq!(
            cart.add(max_priced("B")),
            Err(CartError::TotalOverflow(ProductId::new("B")))
        );
        assert_eq!(ids(&cart), ["A"]);
        assert_eq!(qty(&cart, "A"), 1);
    }

    #[test]
    fn test_decrement_that_would_overflow_is_refused() {
        let unit = |id: &str, amount: Decimal| {
            LineItem::from_descriptor(ProductDescriptor::new(id, id, "", Price::new(amount)))
        };
        let mut cart = Cart::from_lines(vec![
            unit("R", Decimal::NEGATIVE_ONE),
            unit("A", Decimal::MAX),
            unit("B", Decimal::ONE),
        ])
        .unwrap();
        assert_eq!(cart.total(), Decimal::MAX);

        let err = cart.decrement(&ProductId::new("R")).unwrap_err();

        assert_eq!(err, CartError::TotalOverflow(ProductId::new("R")));
        assert_eq!(ids(&cart), ["R", "A", "B"]);
    }

    #[test]
    fn test_from_lines_rejects_untotalable_lines() {
        let mut line = LineItem::from_descriptor(max_priced("A"));
        line.quantity = NonZeroU32::new(2).unwrap();

        let result = Cart::from_lines(vec![line]);

        assert!(matches!(result, Err(SnapshotError::TotalOverflow)));
    }
}
