//! Core types for Vivero.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod quantity;

pub use cart::{Cart, CartLineItem, DEFAULT_ITEM_NAME, RawLineItem};
pub use id::*;
pub use price::Price;
pub use quantity::Quantity;
