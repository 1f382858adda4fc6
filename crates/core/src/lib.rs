//! Vivero Core - Shared types library.
//!
//! This crate provides common types used across all Vivero components:
//! - `storefront` - Session-scoped cart, cross-tab sync and wishlist reconciliation
//! - `cli` - Terminal front end driving the storefront core
//!
//! # Architecture
//!
//! The core crate contains only types and pure operations - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, quantities and cart lines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
