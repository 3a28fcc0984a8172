use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use upi_common::Paise;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order ids cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The order lifecycle. `Paid` and `Failed` are terminal.
///
/// ```text
///   CREATED ──► PENDING ──► PAID
///      │           │
///      │           └──────► FAILED
///      └──────────────────► PAID | FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// Stored locally. The gateway has accepted the order but we have not yet recorded its acknowledgment.
    Created,
    /// The gateway has acknowledged the order and the payer can pay.
    Pending,
    /// The gateway has confirmed payment.
    Paid,
    /// The gateway has reported the payment as failed, closed or expired.
    Failed,
}

pub const ALL_STATUSES: [OrderStatusType; 4] =
    [OrderStatusType::Created, OrderStatusType::Pending, OrderStatusType::Paid, OrderStatusType::Failed];

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`. Self-transitions are not transitions.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Created, Pending) | (Created, Paid) | (Created, Failed) | (Pending, Paid) | (Pending, Failed))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(Self::Created),
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------       PayType         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PayType {
    #[default]
    Upi,
    Paytm,
    PhonePe,
    GPay,
}

impl PayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upi => "UPI",
            Self::Paytm => "PAYTM",
            Self::PhonePe => "PHONEPE",
            Self::GPay => "GPAY",
        }
    }
}

impl Display for PayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPI" => Ok(Self::Upi),
            "PAYTM" => Ok(Self::Paytm),
            "PHONEPE" => Ok(Self::PhonePe),
            "GPAY" => Ok(Self::GPay),
            s => Err(ConversionError(format!("Unsupported pay type: {s}"))),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    /// The gateway's own identifier for the order. Write-once.
    pub platform_order_id: Option<String>,
    pub amount: Paise,
    pub currency: String,
    pub pay_type: PayType,
    pub status: OrderStatusType,
    pub pay_url: Option<String>,
    pub qr_payload: Option<String>,
    /// Payer-supplied bank reference. Informational only. Write-once.
    pub utr: Option<String>,
    /// Client metadata, stored as JSON text.
    pub metadata: Option<String>,
    pub last_callback_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub amount: Paise,
    pub currency: String,
    pub pay_type: PayType,
    pub pay_url: Option<String>,
    pub qr_payload: Option<String>,
    pub platform_order_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, amount: Paise, pay_type: PayType) -> Self {
        Self {
            order_id,
            amount,
            currency: upi_common::INR_CURRENCY_CODE.to_string(),
            pay_type,
            pay_url: None,
            qr_payload: None,
            platform_order_id: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_presentation(mut self, pay_url: String, qr_payload: Option<String>) -> Self {
        self.pay_url = Some(pay_url);
        self.qr_payload = qr_payload;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// A freshly stored order. Backends use this so that every store hands back identical records for identical
    /// inputs.
    pub fn into_order(self, id: i64) -> Order {
        Order {
            id,
            order_id: self.order_id,
            platform_order_id: self.platform_order_id,
            amount: self.amount,
            currency: self.currency,
            pay_type: self.pay_type,
            status: OrderStatusType::Created,
            pay_url: self.pay_url,
            qr_payload: self.qr_payload,
            utr: None,
            metadata: self.metadata,
            last_callback_payload: None,
            created_at: self.created_at,
            updated_at: self.created_at,
            completed_at: None,
        }
    }
}

//--------------------------------------       OrderPatch      ---------------------------------------------------------
/// The fields a [`crate::traits::OrderStore::transition`] may write alongside a status change.
///
/// `platform_order_id`, `pay_url`, `qr_payload` and `utr` are write-once: a value is only stored if the field is still
/// empty. `completed_at` and `last_callback_payload` overwrite whatever is there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub platform_order_id: Option<String>,
    pub pay_url: Option<String>,
    pub qr_payload: Option<String>,
    pub utr: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_callback_payload: Option<String>,
}

impl OrderPatch {
    pub fn with_platform_order_id(mut self, id: Option<String>) -> Self {
        self.platform_order_id = id;
        self
    }

    pub fn with_utr<S: Into<String>>(mut self, utr: S) -> Self {
        self.utr = Some(utr.into());
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn with_callback_payload<S: Into<String>>(mut self, payload: S) -> Self {
        self.last_callback_payload = Some(payload.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.platform_order_id.is_none() &&
            self.pay_url.is_none() &&
            self.qr_payload.is_none() &&
            self.utr.is_none() &&
            self.completed_at.is_none() &&
            self.last_callback_payload.is_none()
    }

    /// Applies the patch to an in-memory record using the same write-once rules the SQL backend uses.
    pub fn apply_to(&self, order: &mut Order) {
        fn set_once(field: &mut Option<String>, value: &Option<String>) {
            if field.is_none() {
                field.clone_from(value);
            }
        }
        set_once(&mut order.platform_order_id, &self.platform_order_id);
        set_once(&mut order.pay_url, &self.pay_url);
        set_once(&mut order.qr_payload, &self.qr_payload);
        set_once(&mut order.utr, &self.utr);
        if self.completed_at.is_some() {
            order.completed_at = self.completed_at;
        }
        if self.last_callback_payload.is_some() {
            order.last_callback_payload.clone_from(&self.last_callback_payload);
        }
    }
}

//--------------------------------------    ReconcileStatus    ---------------------------------------------------------
/// The coarse status reported to payers polling an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReconcileStatus {
    Success,
    Pending,
    Failed,
}

impl From<OrderStatusType> for ReconcileStatus {
    fn from(status: OrderStatusType) -> Self {
        match status {
            OrderStatusType::Paid => Self::Success,
            OrderStatusType::Failed => Self::Failed,
            OrderStatusType::Created | OrderStatusType::Pending => Self::Pending,
        }
    }
}

impl Display for ReconcileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Pending => f.write_str("PENDING"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}
