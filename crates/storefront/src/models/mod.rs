//! Domain models mirrored from the remote API.
//!
//! Every model keeps the fields it does not understand in a flattened
//! `extra` map so that a value read from the backend and written back to
//! local storage round-trips without loss.

pub mod cart;
pub mod order;
pub mod user;

pub use cart::{CartItem, CartProduct};
pub use order::{OrderLineRecord, OrderRecord};
pub use user::User;
