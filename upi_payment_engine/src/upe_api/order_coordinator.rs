use std::{collections::BTreeMap, fmt::Debug};

use chrono::{DateTime, Duration, Utc};
use log::*;
use upi_common::Paise;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderPatch, OrderStatusType, PayType, ALL_STATUSES},
    events::{CallbackDisputeEvent, EventProducers, OrderFailedEvent, OrderPaidEvent},
    helpers::{gateway_timestamp, new_order_id, params_from_json, SignatureCodec},
    traits::{GatewayError, GatewayLink, OrderStore, OrderStoreError},
    upe_api::{
        errors::OrderFlowError,
        order_objects::{
            map_trade_status,
            CallbackOutcome,
            CreatedOrder,
            GatewayCallback,
            NewOrderRequest,
            ReconcileResult,
            StatusRefresh,
        },
    },
};

const RECONCILIATION_TARGET: &str = "upg::reconciliation";
const NON_TERMINAL: [OrderStatusType; 2] = [OrderStatusType::Created, OrderStatusType::Pending];

/// Merchant-side settings the order flow needs to talk to the gateway.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Sent as `mchId`, and required to match on every callback.
    pub merchant_id: String,
    /// Where the gateway should deliver callbacks.
    pub notify_url: String,
    pub order_id_prefix: String,
    pub currency: String,
    /// Sent as `subject`.
    pub subject: String,
    /// Callbacks whose timestamp is further than this from our clock are refused.
    pub callback_max_age: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::default(),
            notify_url: "http://localhost:8443/callbacks/payment".to_string(),
            order_id_prefix: "UP".to_string(),
            currency: upi_common::INR_CURRENCY_CODE.to_string(),
            subject: "Order Payment".to_string(),
            callback_max_age: Duration::seconds(300),
        }
    }
}

/// `OrderCoordinator` drives orders through `CREATED → PENDING → {PAID, FAILED}`.
///
/// Three independent triggers touch an order: the creation response, the gateway callback and the payer's poll / UTR
/// submission. They may race for the same order. All of them go through [`OrderStore::transition`], so whichever
/// lands first wins and the others see a conflict, which is handled here and never surfaces to callers.
pub struct OrderCoordinator<B, G> {
    db: B,
    gateway: G,
    codec: SignatureCodec,
    config: CoordinatorConfig,
    producers: EventProducers,
}

impl<B, G> Debug for OrderCoordinator<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderCoordinator(merchant {})", self.config.merchant_id)
    }
}

impl<B, G> OrderCoordinator<B, G> {
    pub fn new(db: B, gateway: G, codec: SignatureCodec, config: CoordinatorConfig) -> Self {
        Self { db, gateway, codec, config, producers: EventProducers::default() }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }
}

impl<B, G> OrderCoordinator<B, G>
where
    B: OrderStore,
    G: GatewayLink,
{
    /// Creates a new order at the gateway and stores it.
    ///
    /// Every call uses a fresh order id. Nothing is stored unless the gateway accepted the order. If the gateway timed
    /// out, the outcome is unknown and [`OrderFlowError::GatewayTimeout`] carries the id that was tried so that the
    /// caller can look it up at the gateway before trying again.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<CreatedOrder, OrderFlowError> {
        if !request.amount.is_positive() {
            return Err(OrderFlowError::ValidationError(format!("Order amount must be positive, got {}", request.amount)));
        }
        let metadata = encode_metadata(request.metadata)?;
        let order_id = new_order_id(&self.config.order_id_prefix);
        let params = self.creation_params(&order_id, request.amount, request.pay_type, Utc::now());
        let signed = self.codec.sign_params(params);
        debug!("📦️ Requesting order {order_id} for {} from the gateway", request.amount);
        let accepted = match self.gateway.create_order(signed).await {
            Ok(accepted) => accepted,
            Err(GatewayError::Timeout) => {
                warn!("📦️ Gateway timed out creating order {order_id}. The order was not stored.");
                return Err(OrderFlowError::GatewayTimeout { order_id });
            },
            Err(e) => {
                warn!("📦️ Gateway refused order {order_id}. {e}");
                return Err(OrderFlowError::GatewayError(e));
            },
        };
        let new_order = NewOrder::new(order_id.clone(), request.amount, request.pay_type)
            .with_currency(self.config.currency.clone())
            .with_presentation(accepted.pay_url.clone(), accepted.qr_payload.clone())
            .with_metadata(metadata);
        self.db.insert_order(new_order).await?;
        let patch = OrderPatch::default().with_platform_order_id(accepted.platform_order_id);
        let acknowledged =
            self.db.transition(&order_id, &[OrderStatusType::Created], Some(OrderStatusType::Pending), patch).await;
        let order = match acknowledged {
            Ok(order) => order,
            // A callback got there first. Its status is more recent than ours.
            Err(OrderStoreError::Conflict { .. }) => self.db.fetch_order(&order_id).await?,
            Err(e) => return Err(e.into()),
        };
        info!("📦️ Order {order_id} for {} created. Status: {}", order.amount, order.status);
        Ok(CreatedOrder { order_id, pay_url: accepted.pay_url, qr_payload: accepted.qr_payload, order })
    }

    /// Applies a gateway callback, given the raw request body.
    ///
    /// An `Err` means the message must be refused: it is malformed, not signed by the gateway, addressed to another
    /// merchant, or outside the freshness window. Every `Ok` outcome, including unknown orders and duplicate
    /// deliveries, must be acknowledged with [`crate::CALLBACK_ACK`] so that the gateway stops retrying.
    pub async fn handle_callback(&self, body: &[u8]) -> Result<CallbackOutcome, OrderFlowError> {
        let received_at = Utc::now();
        let value = serde_json::from_slice::<serde_json::Value>(body)
            .map_err(|e| OrderFlowError::ValidationError(format!("Callback body is not valid JSON. {e}")))?;
        let params = params_from_json(&value)?;
        if !self.codec.verify(&params) {
            warn!("📞️ Callback signature check failed. The message has been discarded.");
            return Err(OrderFlowError::InvalidSignature);
        }
        let callback = GatewayCallback::from_params(&params)?;
        if callback.merchant_id != self.config.merchant_id {
            warn!("📞️ Callback for order {} is addressed to merchant {}.", callback.order_id, callback.merchant_id);
            return Err(OrderFlowError::ForeignMerchant(callback.merchant_id));
        }
        self.check_freshness(callback.timestamp, received_at)?;
        let order = match self.db.fetch_order(&callback.order_id).await {
            Ok(order) => order,
            Err(OrderStoreError::OrderNotFound(id)) => {
                warn!("📞️ Received a callback for order {id}, which we have no record of. Acknowledging anyway.");
                return Ok(CallbackOutcome::UnknownOrder(id));
            },
            Err(e) => return Err(e.into()),
        };
        check_consistency(&order, callback.amount, callback.platform_order_id.as_deref());
        let payload = String::from_utf8_lossy(body).into_owned();
        match map_trade_status(&callback.trade_status) {
            Some(reported) => self.apply_terminal_callback(callback, reported, payload, received_at).await,
            None => self.apply_progress_callback(order, callback).await,
        }
    }

    async fn apply_terminal_callback(
        &self,
        callback: GatewayCallback,
        reported: OrderStatusType,
        payload: String,
        received_at: DateTime<Utc>,
    ) -> Result<CallbackOutcome, OrderFlowError> {
        let order_id = callback.order_id;
        let patch = OrderPatch::default()
            .with_platform_order_id(callback.platform_order_id)
            .with_completed_at(received_at)
            .with_callback_payload(payload.clone());
        match self.db.transition(&order_id, &NON_TERMINAL, Some(reported), patch).await {
            Ok(order) => {
                info!("📞️ Order {order_id} is now {reported}");
                self.publish_terminal_event(&order).await;
                Ok(CallbackOutcome::Applied(order))
            },
            Err(OrderStoreError::Conflict { current, .. }) if current == reported => {
                debug!("📞️ Duplicate {reported} callback for order {order_id}. Nothing to do.");
                Ok(CallbackOutcome::Duplicate { order_id, status: current })
            },
            Err(OrderStoreError::Conflict { current, .. }) => {
                error!(
                    target: RECONCILIATION_TARGET,
                    "📞️ Order {order_id} is {current} but the gateway now reports {reported}. The stored status has \
                     been kept. Manual reconciliation is required. Payload: {payload}"
                );
                let order = self.db.fetch_order(&order_id).await?;
                self.publish_dispute(CallbackDisputeEvent { order, stored: current, reported, payload }).await;
                Ok(CallbackOutcome::Disputed { order_id, stored: current, reported })
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_progress_callback(
        &self,
        order: Order,
        callback: GatewayCallback,
    ) -> Result<CallbackOutcome, OrderFlowError> {
        let order_id = order.order_id.clone();
        debug!("📞️ Gateway reports order {order_id} as {}", callback.trade_status);
        if order.status != OrderStatusType::Created {
            return Ok(CallbackOutcome::InProgress { order_id, status: order.status });
        }
        let patch = OrderPatch::default().with_platform_order_id(callback.platform_order_id);
        let status =
            match self.db.transition(&order_id, &[OrderStatusType::Created], Some(OrderStatusType::Pending), patch).await {
                Ok(order) => order.status,
                Err(OrderStoreError::Conflict { current, .. }) => current,
                Err(e) => return Err(e.into()),
            };
        Ok(CallbackOutcome::InProgress { order_id, status })
    }

    /// Reports the order's status to a polling payer and records a UTR, if one is given.
    ///
    /// A blank UTR counts as none. The UTR is an annotation for support staff. It never changes the status, and once
    /// recorded it is never replaced.
    pub async fn reconcile(&self, order_id: &OrderId, utr: Option<&str>) -> Result<ReconcileResult, OrderFlowError> {
        let utr = utr.map(str::trim).filter(|u| !u.is_empty());
        let order = match utr {
            None => self.db.fetch_order(order_id).await?,
            Some(utr) => {
                validate_utr(utr)?;
                let patch = OrderPatch::default().with_utr(utr);
                let order = self.db.transition(order_id, &ALL_STATUSES, None, patch).await?;
                match order.utr.as_deref() {
                    Some(stored) if stored != utr => {
                        warn!("📦️ Order {order_id} already has UTR {stored}. The new UTR {utr} was not recorded.")
                    },
                    _ => debug!("📦️ UTR {utr} recorded for order {order_id}"),
                }
                order
            },
        };
        Ok(ReconcileResult { order_id: order.order_id, status: order.status.into(), utr: order.utr })
    }

    /// Asks the gateway for the order's status and applies a final answer.
    ///
    /// Orders that are already final are returned as they are. If the gateway can't be reached, the stored order is
    /// returned with `refreshed = false` and the reason.
    pub async fn refresh_status(&self, order_id: &OrderId) -> Result<StatusRefresh, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?;
        if order.status.is_terminal() {
            return Ok(StatusRefresh { order, refreshed: false, error: None });
        }
        let signed = self.codec.sign_params(self.query_params(order_id, Utc::now()));
        let remote = match self.gateway.query_order(signed).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!("📦️ Could not refresh order {order_id} from the gateway. {e}");
                return Ok(StatusRefresh { order, refreshed: false, error: Some(e.to_string()) });
            },
        };
        check_consistency(&order, remote.actual_amount, remote.platform_order_id.as_deref());
        let (expected, next) = match map_trade_status(&remote.trade_status) {
            Some(status) => (&NON_TERMINAL[..], status),
            None => (&NON_TERMINAL[..1], OrderStatusType::Pending),
        };
        let mut patch = OrderPatch::default().with_platform_order_id(remote.platform_order_id);
        if next.is_terminal() {
            patch = patch.with_completed_at(remote.completed_at.unwrap_or_else(Utc::now));
        }
        let order = match self.db.transition(order_id, expected, Some(next), patch).await {
            Ok(order) => {
                info!("📦️ Order {order_id} refreshed from the gateway. Status: {}", order.status);
                if order.status.is_terminal() {
                    self.publish_terminal_event(&order).await;
                }
                order
            },
            Err(OrderStoreError::Conflict { current, .. }) => {
                if current.is_terminal() && next.is_terminal() && current != next {
                    error!(
                        target: RECONCILIATION_TARGET,
                        "📦️ Order {order_id} is {current} but a gateway query reports {next}. The stored status has \
                         been kept. Manual reconciliation is required."
                    );
                }
                self.db.fetch_order(order_id).await?
            },
            Err(e) => return Err(e.into()),
        };
        Ok(StatusRefresh { order, refreshed: true, error: None })
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        Ok(self.db.fetch_order(order_id).await?)
    }

    fn check_freshness(&self, sent_at: DateTime<Utc>, received_at: DateTime<Utc>) -> Result<(), OrderFlowError> {
        let skew = received_at.signed_duration_since(sent_at);
        let window = self.config.callback_max_age;
        if skew > window || skew < -window {
            warn!("📞️ Callback timestamp {sent_at} is {}s away from our clock. Refusing it.", skew.num_seconds());
            return Err(OrderFlowError::StaleRequest(gateway_timestamp(sent_at)));
        }
        Ok(())
    }

    fn creation_params(
        &self,
        order_id: &OrderId,
        amount: Paise,
        pay_type: PayType,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("mchId".to_string(), self.config.merchant_id.clone()),
            ("outTradeNo".to_string(), order_id.to_string()),
            ("amount".to_string(), amount.to_rupee_string()),
            ("payType".to_string(), pay_type.to_string()),
            ("subject".to_string(), self.config.subject.clone()),
            ("notifyUrl".to_string(), self.config.notify_url.clone()),
            ("timestamp".to_string(), gateway_timestamp(now)),
        ])
    }

    fn query_params(&self, order_id: &OrderId, now: DateTime<Utc>) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("mchId".to_string(), self.config.merchant_id.clone()),
            ("outTradeNo".to_string(), order_id.to_string()),
            ("timestamp".to_string(), gateway_timestamp(now)),
        ])
    }

    async fn publish_terminal_event(&self, order: &Order) {
        match order.status {
            OrderStatusType::Paid => {
                for emitter in &self.producers.order_paid_producer {
                    debug!("📬️ Notifying order paid hook subscribers");
                    emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
                }
            },
            OrderStatusType::Failed => {
                for emitter in &self.producers.order_failed_producer {
                    debug!("📬️ Notifying order failed hook subscribers");
                    emitter.publish_event(OrderFailedEvent::new(order.clone())).await;
                }
            },
            _ => {},
        }
    }

    async fn publish_dispute(&self, event: CallbackDisputeEvent) {
        for emitter in &self.producers.callback_dispute_producer {
            debug!("📬️ Notifying callback dispute hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }
}

/// A UTR is exactly 12 ASCII digits.
pub fn validate_utr(utr: &str) -> Result<(), OrderFlowError> {
    if utr.len() == 12 && utr.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(OrderFlowError::ValidationError(format!("'{utr}' is not a valid UTR. A UTR is exactly 12 digits.")))
    }
}

fn encode_metadata(metadata: Option<serde_json::Value>) -> Result<Option<String>, OrderFlowError> {
    match metadata {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) => serde_json::to_string(&map)
            .map(Some)
            .map_err(|e| OrderFlowError::ValidationError(format!("Metadata cannot be stored. {e}"))),
        Some(_) => Err(OrderFlowError::ValidationError("Metadata must be a JSON object".into())),
    }
}

/// Logs, but does not act on, gateway data that disagrees with the stored order.
fn check_consistency(order: &Order, amount: Option<Paise>, platform_order_id: Option<&str>) {
    if let Some(amount) = amount {
        if amount != order.amount {
            warn!("📦️ Gateway reports {amount} for order {} but the order is for {}", order.order_id, order.amount);
        }
    }
    if let (Some(stored), Some(reported)) = (order.platform_order_id.as_deref(), platform_order_id) {
        if stored != reported {
            warn!(
                "📦️ Gateway reports transaction id {reported} for order {} but we hold {stored}",
                order.order_id
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn utr_format() {
        assert!(validate_utr("123456789012").is_ok());
        for bad in ["12345678901", "1234567890123", "12345678901a", "１２３４５６７８９０１２", "-12345678901"] {
            assert!(validate_utr(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn metadata_must_be_an_object() {
        assert_eq!(encode_metadata(None).unwrap(), None);
        assert_eq!(encode_metadata(Some(serde_json::Value::Null)).unwrap(), None);
        assert_eq!(encode_metadata(Some(serde_json::json!({"cart": 7}))).unwrap().as_deref(), Some(r#"{"cart":7}"#));
        assert!(encode_metadata(Some(serde_json::json!([1, 2]))).is_err());
        assert!(encode_metadata(Some(serde_json::json!("note"))).is_err());
    }
}
