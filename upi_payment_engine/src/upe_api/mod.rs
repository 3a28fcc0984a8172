//! # UPI payment engine public API
//!
//! [`order_coordinator::OrderCoordinator`] is the entry point for everything that happens to an order: creating it at
//! the gateway, applying the gateway's callbacks, and answering payer polls and UTR submissions. It owns the order
//! state machine and is the only component that calls [`crate::traits::OrderStore::transition`].
//!
//! The API is created from a storage backend and a gateway link:
//!
//! ```rust,ignore
//! use upi_payment_engine::{MemoryDatabase, OrderCoordinator};
//! let coordinator = OrderCoordinator::new(MemoryDatabase::new(), gateway, codec, config);
//! let created = coordinator.create_order(request).await?;
//! ```
pub mod errors;
pub mod order_coordinator;
pub mod order_objects;

/// The body the gateway expects in reply to a callback it should not resend.
pub const CALLBACK_ACK: &str = "SUCCESS";
