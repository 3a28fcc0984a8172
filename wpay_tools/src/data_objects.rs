use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use upi_common::Paise;

/// The `code` the gateway uses for an accepted request.
pub const WPAY_SUCCESS: &str = "SUCCESS";

/// The envelope around every gateway reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct WPayResponse<T> {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> WPayResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code.eq_ignore_ascii_case(WPAY_SUCCESS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderData {
    #[serde(alias = "payUrl")]
    pub upi_url: String,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOrderData {
    pub trade_status: String,
    /// Sent as either a JSON number or a string, in rupees.
    #[serde(default, alias = "actualAmount")]
    pub amount: Option<Value>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// `YYYYMMDDhhmmss`, UTC.
    #[serde(default)]
    pub complete_time: Option<String>,
}

impl QueryOrderData {
    pub fn amount(&self) -> Option<Paise> {
        match self.amount.as_ref()? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.to_string().parse().ok(),
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        let s = self.complete_time.as_deref()?;
        NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S").ok().map(|dt| dt.and_utc())
    }
}
