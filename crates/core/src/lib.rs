//! Marketplace Core - Shared cart types.
//!
//! This crate provides the value types used across the marketplace cart
//! components:
//! - `cart` - The cart engine (store, persistence, derived view)
//! - `cli` - Command-line driver for a file-backed cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no async
//! runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs and prices, plus line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
