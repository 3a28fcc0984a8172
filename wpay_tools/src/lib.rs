//! A thin client for the WPay gateway's REST API.
//!
//! This crate only moves bytes. It posts parameter sets that have already been signed and hands back the parsed
//! `data` section of the gateway's reply. It knows nothing about orders or their lifecycle.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::WPayApi;
pub use config::WPayConfig;
pub use data_objects::{CreateOrderData, QueryOrderData, WPayResponse, WPAY_SUCCESS};
pub use error::WPayApiError;
