#![allow(dead_code)]
pub mod fake_gateway;
pub mod prepare_env;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use upi_common::Secret;
use upi_payment_engine::{
    helpers::{gateway_timestamp, SignatureCodec},
    CoordinatorConfig,
};

pub const SECRET: &str = "eb6080dbc8dc429ab86a1cd1c337975d";
pub const MCH_ID: &str = "1000";

pub fn codec() -> SignatureCodec {
    SignatureCodec::new(Secret::new(SECRET.to_string()))
}

pub fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        merchant_id: MCH_ID.to_string(),
        notify_url: "https://pay.example.in/callbacks/payment".to_string(),
        ..CoordinatorConfig::default()
    }
}

/// A callback body as the gateway would send it, signed with [`SECRET`].
pub fn signed_callback(order_id: &str, trade_status: &str, amount: &str, at: DateTime<Utc>) -> Vec<u8> {
    let params = callback_params(order_id, trade_status, amount, at);
    let signed = codec().sign_params(params);
    serde_json::to_vec(signed.as_map()).expect("callback params serialise")
}

pub fn callback_params(order_id: &str, trade_status: &str, amount: &str, at: DateTime<Utc>) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("mchId".to_string(), MCH_ID.to_string()),
        ("outTradeNo".to_string(), order_id.to_string()),
        ("transactionId".to_string(), format!("WP{order_id}")),
        ("tradeStatus".to_string(), trade_status.to_string()),
        ("amount".to_string(), amount.to_string()),
        ("timestamp".to_string(), gateway_timestamp(at)),
    ])
}
