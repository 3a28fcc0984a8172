use std::{env, net::IpAddr};

use chrono::Duration;
use log::*;
use upi_common::{parse_boolean_flag, parse_ip_list, INR_CURRENCY_CODE};
use upi_payment_engine::CoordinatorConfig;
use wpay_tools::WPayConfig;

const DEFAULT_UPG_HOST: &str = "127.0.0.1";
const DEFAULT_UPG_PORT: u16 = 8443;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/upi_store.db";
const DEFAULT_PUBLIC_DOMAIN: &str = "http://localhost:8443";
const DEFAULT_CALLBACK_MAX_AGE: Duration = Duration::seconds(300);
const DEFAULT_ORDER_ID_PREFIX: &str = "UP";
const DEFAULT_ORDER_SUBJECT: &str = "Order Payment";
pub const CALLBACK_PATH: &str = "/callbacks/payment";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// A SQLite URL, or `memory` for the in-memory store.
    pub database_url: String,
    /// The externally visible base URL of this server. Used to build the callback URL handed to the gateway.
    pub public_domain: String,
    pub wpay: WPayConfig,
    pub callback_max_age: Duration,
    /// If supplied, callback requests are only accepted from these addresses.
    pub callback_whitelist: Option<Vec<IpAddr>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub order_id_prefix: String,
    pub currency: String,
    pub subject: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_UPG_HOST.to_string(),
            port: DEFAULT_UPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            public_domain: DEFAULT_PUBLIC_DOMAIN.to_string(),
            wpay: WPayConfig::default(),
            callback_max_age: DEFAULT_CALLBACK_MAX_AGE,
            callback_whitelist: None,
            use_x_forwarded_for: false,
            use_forwarded: false,
            order_id_prefix: DEFAULT_ORDER_ID_PREFIX.to_string(),
            currency: INR_CURRENCY_CODE.to_string(),
            subject: DEFAULT_ORDER_SUBJECT.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("UPG_HOST").ok().unwrap_or_else(|| DEFAULT_UPG_HOST.into());
        let port = env::var("UPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for UPG_PORT. {e} Using the default, {DEFAULT_UPG_PORT}, instead."
                    );
                    DEFAULT_UPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_UPG_PORT);
        let database_url = env::var("UPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ UPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.into()
        });
        let public_domain = env::var("UPG_PUBLIC_DOMAIN").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ UPG_PUBLIC_DOMAIN is not set. The gateway will be told to send callbacks to \
                 {DEFAULT_PUBLIC_DOMAIN}, which it probably cannot reach."
            );
            DEFAULT_PUBLIC_DOMAIN.into()
        });
        let callback_max_age = env::var("UPG_CALLBACK_MAX_AGE")
            .ok()
            .and_then(|s| match s.parse::<i64>() {
                Ok(secs) if secs > 0 => Some(Duration::seconds(secs)),
                _ => {
                    error!(
                        "🪛️ Invalid UPG_CALLBACK_MAX_AGE value: {s}. Using the default of {}s.",
                        DEFAULT_CALLBACK_MAX_AGE.num_seconds()
                    );
                    None
                },
            })
            .unwrap_or(DEFAULT_CALLBACK_MAX_AGE);
        let callback_whitelist = configure_whitelist(env::var("UPG_CALLBACK_IP_WHITELIST").ok());
        let use_x_forwarded_for = parse_boolean_flag(env::var("UPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("UPG_USE_FORWARDED").ok(), false);
        let order_id_prefix = env::var("UPG_ORDER_ID_PREFIX").ok().unwrap_or_else(|| DEFAULT_ORDER_ID_PREFIX.into());
        let currency = env::var("UPG_CURRENCY").ok().unwrap_or_else(|| INR_CURRENCY_CODE.into());
        let subject = env::var("UPG_ORDER_SUBJECT").ok().unwrap_or_else(|| DEFAULT_ORDER_SUBJECT.into());
        Self {
            host,
            port,
            database_url,
            public_domain,
            wpay: WPayConfig::new_from_env_or_default(),
            callback_max_age,
            callback_whitelist,
            use_x_forwarded_for,
            use_forwarded,
            order_id_prefix,
            currency,
            subject,
        }
    }

    pub fn notify_url(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.public_domain.trim_end_matches('/'))
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            merchant_id: self.wpay.merchant_id.clone(),
            notify_url: self.notify_url(),
            order_id_prefix: self.order_id_prefix.clone(),
            currency: self.currency.clone(),
            subject: self.subject.clone(),
            callback_max_age: self.callback_max_age,
        }
    }
}

/// Interprets the value of `UPG_CALLBACK_IP_WHITELIST`. `None` means the whitelist is disabled.
pub fn configure_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let value = value?;
    if ["none", "false", "0", ""].contains(&value.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Callback IP whitelist is disabled. If this is not what you want, set UPG_CALLBACK_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let (ips, invalid) = parse_ip_list(&value);
    invalid.iter().for_each(|s| warn!("🪛️ Ignoring invalid IP address ({s}) in UPG_CALLBACK_IP_WHITELIST"));
    if ips.is_empty() {
        warn!(
            "🚨️ The callback IP whitelist was configured, but is empty. The server will run, but won't accept any \
             payment callbacks."
        );
    } else {
        info!("🪛️ Callback IP whitelist: {ips:?}");
    }
    Some(ips)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_values() {
        assert_eq!(configure_whitelist(None), None);
        assert_eq!(configure_whitelist(Some("None".into())), None);
        assert_eq!(configure_whitelist(Some("0".into())), None);
        let ips = configure_whitelist(Some("10.1.1.1, bogus, 10.1.1.2".into())).unwrap();
        assert_eq!(ips, vec!["10.1.1.1".parse::<IpAddr>().unwrap(), "10.1.1.2".parse().unwrap()]);
        assert_eq!(configure_whitelist(Some("bogus".into())), Some(vec![]));
    }

    #[test]
    fn notify_url_from_public_domain() {
        let mut config = ServerConfig::default();
        assert_eq!(config.notify_url(), "http://localhost:8443/callbacks/payment");
        config.public_domain = "https://pay.example.in/".into();
        let coordinator = config.coordinator_config();
        assert_eq!(coordinator.notify_url, "https://pay.example.in/callbacks/payment");
        assert_eq!(coordinator.order_id_prefix, "UP");
        assert_eq!(coordinator.callback_max_age, Duration::seconds(300));
    }
}
