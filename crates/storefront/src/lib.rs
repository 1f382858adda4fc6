//! Vivero storefront library.
//!
//! Session-scoped carts, the pre-login cart migration, cross-tab
//! synchronization and wishlist reconciliation for the Vivero plant shop.
//!
//! # Modules
//!
//! - [`session`] - token claims and the storage namespace derived from them
//! - [`storage`] - persistent and tab-scoped key/value storage
//! - [`cart`] - per-namespace carts and the legacy cart migration
//! - [`sync`] - reacting to storage changes made by other tabs
//! - [`wishlist`] - remote favorites and indicator reconciliation
//! - [`views`] - UI-facing state derived from all of the above
//! - [`order`] - order summaries handed off over WhatsApp
//! - [`context`] - the per-tab context tying it together
//!
//! Token claims are decoded without signature verification and drive UX
//! only. The remote API verifies the token on every privileged call.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod context;
pub mod error;
pub mod order;
pub mod session;
pub mod storage;
pub mod sync;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod views;
pub mod wishlist;

pub use context::StorefrontContext;
pub use error::{AppError, Result};
