use futures::future::BoxFuture;
use log::*;
use upi_payment_engine::events::{CallbackDisputeEvent, EventHandlers, EventHooks, OrderFailedEvent, OrderPaidEvent};

pub const ORDER_EVENT_BUFFER_SIZE: usize = 25;

/// Hooks that record order outcomes in the log.
///
/// 1. OrderPaidEvent and OrderFailedEvent are logged at `info` level, once per order.
/// 2. CallbackDisputeEvent means the gateway has reported a final status that contradicts the one we stored. The
///    stored status is kept. The engine has already logged the full payload to `upg::reconciliation`.
pub fn create_order_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev: OrderPaidEvent| {
        let order = ev.order;
        info!("📬️ Order {} for {} has been paid. UPI ref: {}", order.order_id, order.amount, platform_id(&order));
        no_op()
    });
    hooks.on_order_failed(|ev: OrderFailedEvent| {
        let order = ev.order;
        info!("📬️ Payment for order {} ({}) failed", order.order_id, order.amount);
        no_op()
    });
    hooks.on_callback_dispute(|ev: CallbackDisputeEvent| {
        let CallbackDisputeEvent { order, stored, reported, .. } = ev;
        warn!("📬️ Order {} is {stored}, but the gateway now reports {reported}. Settle it by hand.", order.order_id);
        no_op()
    });
    EventHandlers::new(ORDER_EVENT_BUFFER_SIZE, hooks)
}

fn platform_id(order: &upi_payment_engine::db_types::Order) -> &str {
    order.platform_order_id.as_deref().unwrap_or("unknown")
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
