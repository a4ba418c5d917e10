//! Client-side state stores.
//!
//! Each store is a cheap `Clone` handle over shared state guarded by a
//! `tokio::sync::RwLock`. Operations follow the same shape:
//!
//! 1. take the write lock, mark the operation `loading`, release the lock
//! 2. perform the network call with no lock held
//! 3. take the write lock again and apply a pure state transition
//!
//! Transitions live on the plain state structs ([`AuthState`],
//! [`CartState`], [`OrderState`]) so they can be tested without a server.
//! Every failure leaves the previously held data unchanged.

mod auth;
mod cart;
mod order;

pub use auth::{AuthState, AuthStore};
pub use cart::{CartState, CartStore};
pub use order::{OrderState, OrderStore};
