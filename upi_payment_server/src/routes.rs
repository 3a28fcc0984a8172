//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the store or the gateway, so none of them
//! block.
use std::str::FromStr;

use actix_web::{get, http::header::ContentType, web, HttpResponse, Responder};
use log::*;
use upi_payment_engine::{
    db_types::OrderId,
    order_objects::{CallbackOutcome, NewOrderRequest},
    traits::{GatewayLink, OrderStore},
    OrderCoordinator,
    OrderFlowError,
    CALLBACK_ACK,
};

use crate::{
    data_objects::{
        CreateOrderParams,
        OrderCreatedResponse,
        OrderStatusResponse,
        ReconcileParams,
        ReconcileResponse,
        StatusRefreshResponse,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderStore, GatewayLink);
/// Creates an order at the gateway and returns the payment link the payer should open.
///
/// The amount is in rupees and may be sent as a string or a number. A `504` response carries the `orderId` that was
/// tried. That order may exist at the gateway, so query it there before trying again.
pub async fn create_order<B, G>(
    body: web::Json<CreateOrderParams>,
    api: web::Data<OrderCoordinator<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: GatewayLink,
{
    let request = NewOrderRequest::try_from(body.into_inner())?;
    debug!("💻️ New order request for {} via {}", request.amount, request.pay_type);
    let created = api.create_order(request).await?;
    Ok(HttpResponse::Created().json(OrderCreatedResponse::from(created)))
}

route!(order_status => Get "/orders/{order_id}" impl OrderStore, GatewayLink);
pub async fn order_status<B, G>(
    path: web::Path<String>,
    api: web::Data<OrderCoordinator<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: GatewayLink,
{
    let order_id = order_id_from_path(&path)?;
    trace!("💻️ Status request for order {order_id}");
    let order = api.fetch_order(&order_id).await?;
    let response = OrderStatusResponse { order_id: order.order_id, status: order.status, created_at: order.created_at };
    Ok(HttpResponse::Ok().json(response))
}

route!(reconcile_order => Post "/orders/{order_id}/reconcile" impl OrderStore, GatewayLink);
/// The payer's "I have paid" poll, optionally carrying the bank reference (UTR) they were given.
///
/// The UTR is recorded for support purposes only. It never changes the order status.
pub async fn reconcile_order<B, G>(
    path: web::Path<String>,
    body: web::Bytes,
    api: web::Data<OrderCoordinator<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: GatewayLink,
{
    let order_id = order_id_from_path(&path)?;
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        ReconcileParams::default()
    } else {
        serde_json::from_slice::<ReconcileParams>(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?
    };
    trace!("💻️ Reconcile request for order {order_id}");
    let result = api.reconcile(&order_id, params.utr.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ReconcileResponse { status: result.status }))
}

route!(refresh_order => Post "/orders/{order_id}/query" impl OrderStore, GatewayLink);
/// Asks the gateway for the order's status and applies a final answer.
///
/// If the gateway cannot be reached, the stored status is returned with `refreshed: false`.
pub async fn refresh_order<B, G>(
    path: web::Path<String>,
    api: web::Data<OrderCoordinator<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: GatewayLink,
{
    let order_id = order_id_from_path(&path)?;
    trace!("💻️ Status refresh request for order {order_id}");
    let refresh = api.refresh_status(&order_id).await?;
    Ok(HttpResponse::Ok().json(StatusRefreshResponse::from(refresh)))
}

//----------------------------------------------   Callbacks  ----------------------------------------------------
route!(payment_callback => Post "/payment" impl OrderStore, GatewayLink);
/// The gateway's payment notification.
///
/// The gateway keeps retrying until it receives the plain-text acknowledgment, so it is sent for every outcome except
/// messages we refuse outright (malformed, badly signed, for another merchant, or stale). Internal failures are
/// acknowledged too. The status can still be recovered with a refresh.
pub async fn payment_callback<B, G>(
    body: web::Bytes,
    api: web::Data<OrderCoordinator<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: GatewayLink,
{
    trace!("📞️ Received payment callback");
    match api.handle_callback(&body).await {
        Ok(outcome) => {
            match outcome {
                CallbackOutcome::Applied(order) => info!("📞️ Order {} is now {}", order.order_id, order.status),
                CallbackOutcome::Duplicate { order_id, status } => {
                    debug!("📞️ Repeat callback for order {order_id}, which is already {status}")
                },
                CallbackOutcome::Disputed { order_id, stored, reported } => {
                    warn!("📞️ Callback for order {order_id} reports {reported}, but it is already {stored}")
                },
                CallbackOutcome::InProgress { order_id, status } => {
                    debug!("📞️ Order {order_id} is still in progress ({status})")
                },
                CallbackOutcome::UnknownOrder(order_id) => warn!("📞️ Callback for unknown order {order_id}"),
            }
            Ok(acknowledgment())
        },
        Err(
            e @ (OrderFlowError::ValidationError(_)
            | OrderFlowError::InvalidSignature
            | OrderFlowError::ForeignMerchant(_)
            | OrderFlowError::StaleRequest(_)),
        ) => {
            warn!("📞️ Refusing payment callback. {e}");
            Err(e.into())
        },
        Err(e) => {
            error!("📞️ Could not process payment callback. It will be acknowledged anyway. {e}");
            Ok(acknowledgment())
        },
    }
}

fn acknowledgment() -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::plaintext()).body(CALLBACK_ACK)
}

fn order_id_from_path(path: &str) -> Result<OrderId, ServerError> {
    OrderId::from_str(path).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}
