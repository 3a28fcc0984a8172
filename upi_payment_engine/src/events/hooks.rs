use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CallbackDisputeEvent, EventHandler, EventProducer, Handler, OrderFailedEvent, OrderPaidEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_failed_producer: Vec<EventProducer<OrderFailedEvent>>,
    pub callback_dispute_producer: Vec<EventProducer<CallbackDisputeEvent>>,
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_failed: Option<EventHandler<OrderFailedEvent>>,
    pub on_callback_dispute: Option<EventHandler<CallbackDisputeEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_failed = hooks.on_order_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_callback_dispute = hooks.on_callback_dispute.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_order_failed, on_callback_dispute }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_failed {
            result.order_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_callback_dispute {
            result.callback_dispute_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns one task per registered handler. Each task ends once all of its producers have been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_failed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_callback_dispute {
            tokio::spawn(handler.start_handler());
        }
    }
}

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_failed: Option<Handler<OrderFailedEvent>>,
    pub on_callback_dispute: Option<Handler<CallbackDisputeEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFailedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_failed = Some(Arc::new(f));
        self
    }

    pub fn on_callback_dispute<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CallbackDisputeEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_callback_dispute = Some(Arc::new(f));
        self
    }
}
