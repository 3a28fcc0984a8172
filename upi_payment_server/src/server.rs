use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::future::{ok, Either};
use log::*;
use upi_payment_engine::{
    events::EventProducers,
    helpers::SignatureCodec,
    traits::{GatewayLink, OrderStore},
    MemoryDatabase,
    OrderCoordinator,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{order_events::create_order_event_handlers, wpay::WPayGateway},
    routes::{
        health,
        CreateOrderRoute,
        OrderStatusRoute,
        PaymentCallbackRoute,
        ReconcileOrderRoute,
        RefreshOrderRoute,
    },
};

/// The `UPG_DATABASE_URL` value that selects the non-durable in-memory store.
pub const MEMORY_DATABASE_URL: &str = "memory";
const MAX_DB_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let gateway = WPayGateway::new(config.wpay.clone())?;
    let handlers = create_order_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = if config.database_url == MEMORY_DATABASE_URL {
        warn!("🚨️ Orders are held in memory and will be lost when the server stops.");
        create_server_instance(config, MemoryDatabase::new(), gateway, producers)?
    } else {
        let db = SqliteDatabase::open(&config.database_url, MAX_DB_CONNECTIONS)
            .await
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        info!("🗃️ Using order database at {}", config.database_url);
        create_server_instance(config, db, gateway, producers)?
    };
    srv.await.map_err(ServerError::from)
}

pub fn create_server_instance<B, G>(
    config: ServerConfig,
    db: B,
    gateway: G,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: OrderStore + Clone + Send + 'static,
    G: GatewayLink + Clone + Send + 'static,
{
    let codec = SignatureCodec::new(config.wpay.secret_key.clone());
    let bind_to = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let coordinator =
            OrderCoordinator::new(db.clone(), gateway.clone(), codec.clone(), config.coordinator_config())
                .with_producers(producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("upg::access_log"))
            .app_data(web::Data::new(coordinator))
            .configure(|cfg| configure_routes::<B, G>(cfg, &config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_to)?
    .run();
    Ok(srv)
}

/// Registers every route. The order coordinator must already be present as app data.
pub fn configure_routes<B, G>(cfg: &mut web::ServiceConfig, config: &ServerConfig)
where
    B: OrderStore + 'static,
    G: GatewayLink + 'static,
{
    let use_x_forwarded_for = config.use_x_forwarded_for;
    let use_forwarded = config.use_forwarded;
    let whitelist = config.callback_whitelist.clone();
    let callback_scope = web::scope("/callbacks")
        .wrap_fn(move |req, srv| {
            let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
            let allowed = match (peer_ip, &whitelist) {
                (_, None) => true,
                (Some(ip), Some(whitelist)) => {
                    let allowed = whitelist.contains(&ip);
                    if !allowed {
                        warn!("📞️ Payment callback from {ip}, which is not whitelisted. Denying access.");
                    }
                    allowed
                },
                (None, Some(_)) => {
                    warn!("📞️ No IP address found for payment callback request, denying access.");
                    false
                },
            };
            if allowed {
                Either::Left(srv.call(req))
            } else {
                let err = ServerError::ForbiddenPeer("Callbacks are only accepted from the gateway".into());
                Either::Right(ok(req.error_response(err)))
            }
        })
        .service(PaymentCallbackRoute::<B, G>::new());
    cfg.app_data(json_config())
        .service(health)
        .service(CreateOrderRoute::<B, G>::new())
        .service(OrderStatusRoute::<B, G>::new())
        .service(ReconcileOrderRoute::<B, G>::new())
        .service(RefreshOrderRoute::<B, G>::new())
        .service(callback_scope);
}

/// Malformed JSON bodies get the same `{"error": ...}` shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}
