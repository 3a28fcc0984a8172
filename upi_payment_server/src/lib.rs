//! # UPI payment gateway server
//! This crate hosts the HTTP front end of the gateway. It is responsible for:
//! Accepting order requests from the storefront and handing back a UPI payment link.
//! Receiving the remote gateway's signed payment callbacks and acknowledging them.
//! Answering payers who poll an order, optionally with their bank reference (UTR).
//!
//! The order lifecycle itself lives in [`upi_payment_engine`]. This crate maps HTTP onto it.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /orders`: Create an order. Returns `201 {orderId, payUrl, qrPayload}`.
//! * `GET /orders/{orderId}`: `{orderId, status, createdAt}`.
//! * `POST /orders/{orderId}/reconcile`: Payer poll with an optional `{utr}`. Returns `{status}`.
//! * `POST /orders/{orderId}/query`: Ask the gateway for the order's status.
//! * `POST /callbacks/payment`: The gateway's payment notification. Optionally restricted to whitelisted IPs.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
