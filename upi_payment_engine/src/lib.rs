//! UPI Payment Engine
//!
//! The engine mediates UPI pay-in orders between a merchant application and a remote payment gateway. It creates
//! orders at the gateway, applies the gateway's signed callbacks and answers payer polls. It knows nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. Storage ([`traits::OrderStore`]). [`SqliteDatabase`] is the durable backend and [`MemoryDatabase`] keeps
//!    everything in process. The data types they store live in [`db_types`].
//! 2. The gateway contract ([`traits::GatewayLink`]) and the parameter signing it relies on ([`helpers`]).
//! 3. The public API ([`OrderCoordinator`]), which owns the order state machine.
//!
//! The engine also publishes events when orders are paid or fail, or when a callback disagrees with an order's final
//! status. See [`events`] for how to hook into them.
pub mod db_types;
pub mod events;
pub mod helpers;
mod memory;
pub mod traits;
mod upe_api;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use upe_api::{
    errors::OrderFlowError,
    order_coordinator::{validate_utr, CoordinatorConfig, OrderCoordinator},
    order_objects,
    CALLBACK_ACK,
};
