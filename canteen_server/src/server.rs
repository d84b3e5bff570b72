use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use canteen_engine::{
    events::{EventHandlers, EventHooks},
    NotificationApi,
    OrderFlowApi,
    SqliteDatabase,
    SqliteWallet,
    WalletApi,
};
use log::*;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    routes::{
        health,
        CancelOrderRoute,
        ConfirmPaymentRoute,
        MarkAllReadRoute,
        MyBalanceRoute,
        MyOrdersRoute,
        MyWalletHistoryRoute,
        OrderByIdRoute,
        OrderHistoryRoute,
        PlaceOrderRoute,
        ProcessableOrdersRoute,
        ProgressOrderRoute,
        RejectOrderRoute,
        StudentWalletHistoryRoute,
        TopUpRoute,
        UnreadCountRoute,
        UnreadNotificationsRoute,
        UpdateOrderRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

type OrdersApi = OrderFlowApi<SqliteDatabase, SqliteWallet>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Canteen database migration failed. {e}")))?;
    let wallet = SqliteWallet::new_with_url(&config.wallet_database_url, 10)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    wallet.migrate().await.map_err(|e| ServerError::InitializeError(format!("Wallet database migration failed. {e}")))?;

    let notifications_api = NotificationApi::new(db.clone());
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks(notifications_api.clone()));
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let orders_api = OrderFlowApi::new(db, wallet.clone(), producers)
        .with_expiry_notifications(config.notify_on_expiry);
    let wallet_api = WalletApi::new(wallet);

    let shutdown = CancellationToken::new();
    let worker = start_expiry_worker(
        orders_api.clone(),
        config.expiry_interval,
        config.unpaid_order_timeout,
        shutdown.clone(),
    );
    let srv = create_server_instance(config, orders_api, notifications_api, wallet_api)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    shutdown.cancel();
    if let Err(e) = worker.await {
        warn!("🕰️ Expiry worker did not shut down cleanly. {e}");
    }
    result
}

/// Every notification raised by the order flow is stored in the recipient's inbox.
pub fn notification_hooks(api: NotificationApi<SqliteDatabase>) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_notification(move |event| {
        let api = api.clone();
        Box::pin(async move {
            let user_id = event.user_id;
            if let Err(e) = api.deliver(event).await {
                warn!("📬️ Could not store notification for user #{user_id}. {e}");
            }
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    orders_api: OrdersApi,
    notifications_api: NotificationApi<SqliteDatabase>,
    wallet_api: WalletApi<SqliteWallet>,
) -> Result<Server, ServerError> {
    // %{r}a is the client address as reported by proxy headers
    let log_format = if config.use_x_forwarded_for {
        "%t (%D ms) %s %{r}a %{Host}i %r"
    } else {
        "%t (%D ms) %s %a %{Host}i %r"
    };
    let srv = HttpServer::new(move || {
        let api_scope = web::scope("/api")
            .service(PlaceOrderRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(ProcessableOrdersRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(MyOrdersRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(OrderHistoryRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(OrderByIdRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(UpdateOrderRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(ConfirmPaymentRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(CancelOrderRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(ProgressOrderRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(RejectOrderRoute::<SqliteDatabase, SqliteWallet>::new())
            .service(UnreadNotificationsRoute::<SqliteDatabase>::new())
            .service(UnreadCountRoute::<SqliteDatabase>::new())
            .service(MarkAllReadRoute::<SqliteDatabase>::new())
            .service(MyBalanceRoute::<SqliteWallet>::new())
            .service(MyWalletHistoryRoute::<SqliteWallet>::new())
            .service(TopUpRoute::<SqliteWallet>::new())
            .service(StudentWalletHistoryRoute::<SqliteWallet>::new());
        App::new()
            .wrap(Logger::new(log_format).log_target("canteen::access_log"))
            .app_data(web::Data::new(orders_api.clone()))
            .app_data(web::Data::new(notifications_api.clone()))
            .app_data(web::Data::new(wallet_api.clone()))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Canteen server listening on {}:{}", config.host, config.port);
    Ok(srv)
}
