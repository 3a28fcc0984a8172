//! # Backend and collaborator contracts
//!
//! The engine talks to the outside world through two traits.
//!
//! * [`OrderStore`] is the durable keyed record of orders. Its only mutation primitive is an atomic per-order
//!   check-and-set ([`OrderStore::transition`]), which is what keeps concurrent callbacks and polls for the same order
//!   consistent without a global lock.
//! * [`GatewayLink`] issues signed requests to the remote payment gateway and returns its parsed answer. Transport,
//!   retries and timeouts belong to the implementation.
mod gateway_link;
mod order_store;

pub use gateway_link::{GatewayError, GatewayLink, GatewayOrder, GatewayOrderStatus};
pub(crate) use order_store::allowed_prior_states;
pub use order_store::{OrderStore, OrderStoreError};
