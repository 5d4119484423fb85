//! Core types for the marketplace cart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod line_item;
pub mod price;

pub use id::*;
pub use line_item::{LineItem, ProductDescriptor};
pub use price::Price;
