//! Velorm Core - Shared types library.
//!
//! This crate provides common types used across all Velorm components:
//! - `storefront` - Client-side cart, order, and session state synchronization
//! - `cli` - Command-line front end driving the storefront stores
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, contacts, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
