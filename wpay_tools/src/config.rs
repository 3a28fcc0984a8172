use std::time::Duration;

use log::*;
use upi_common::Secret;

const DEFAULT_WPAY_HOST: &str = "https://sandbox.wpay.one";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct WPayConfig {
    /// Base URL of the gateway, without a trailing slash.
    pub host: String,
    pub merchant_id: String,
    pub secret_key: Secret<String>,
    pub timeout: Duration,
}

impl Default for WPayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WPAY_HOST.to_string(),
            merchant_id: String::default(),
            secret_key: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl WPayConfig {
    pub fn new_from_env_or_default() -> Self {
        let host = std::env::var("UPG_WPAY_HOST")
            .map(|h| h.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                warn!("🪛️ UPG_WPAY_HOST not set, using {DEFAULT_WPAY_HOST}");
                DEFAULT_WPAY_HOST.to_string()
            });
        let merchant_id = std::env::var("UPG_WPAY_MCH_ID").unwrap_or_else(|_| {
            warn!("🪛️ UPG_WPAY_MCH_ID not set. The gateway will reject every order until it is.");
            String::default()
        });
        let secret_key = Secret::new(std::env::var("UPG_WPAY_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ UPG_WPAY_SECRET_KEY not set. No callback will pass signature checks until it is.");
            String::default()
        }));
        let timeout = std::env::var("UPG_GATEWAY_TIMEOUT")
            .ok()
            .and_then(|s| match s.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(secs),
                _ => {
                    error!("🪛️ Invalid UPG_GATEWAY_TIMEOUT value: {s}. Using the default of {DEFAULT_TIMEOUT_SECS}s.");
                    None
                },
            })
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self { host, merchant_id, secret_key, timeout }
    }
}
