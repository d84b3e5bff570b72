//! Request handlers for the canteen API.
//!
//! Handlers stay thin: pull the caller's [`Identity`] and the relevant API object out of the request, make one engine
//! call, and turn the result into JSON. Business rules live in `canteen_engine`.
//!
//! Role checks happen in the ACL middleware that `route!` wraps around each resource, so a handler only runs for
//! callers with an allowed role. The engine checks ownership when a student acts on an order; `order_by_id` checks it
//! itself, since staff may read any order.
use actix_web::{get, web, HttpResponse, Responder};
use canteen_engine::{
    db_types::{Money, OrderId, Role, UserId},
    order_objects::PlaceOrderRequest,
    CanteenDatabase,
    CatalogManagement,
    NotificationApi,
    NotificationManagement,
    OrderFlowApi,
    OrderManagement,
    Wallet,
    WalletApi,
    WalletLedger,
};
use log::*;

use crate::{
    auth::Identity,
    data_objects::{
        BalanceResult,
        JsonResponse,
        NotificationsResult,
        RejectOrderParams,
        TopUpParams,
        UnreadCountResult,
        UpdateOrderParams,
        WalletHistoryResult,
    },
    errors::ServerError,
};

/// Roles that work in the kitchen or run the canteen.
pub const STAFF: &[Role] = &[Role::CanteenStaff, Role::CanteenManager, Role::SystemAdmin];
pub const STUDENTS: &[Role] = &[Role::Student];
/// Any identified user.
pub const ANYONE: &[Role] = &[];

/// Everything the order flow needs from the canteen database.
pub trait OrderBackend: CanteenDatabase + OrderManagement + CatalogManagement + 'static {}

impl<T> OrderBackend for T where T: CanteenDatabase + OrderManagement + CatalogManagement + 'static {}

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Each bound becomes a type parameter of the route, named after the bound: `impl OrderBackend, Wallet` produces
// `XxxRoute<TOrderBackend, TWallet>`.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires $roles:expr) => {
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
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new($roles));
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
route!(place_order => Post "/orders" impl OrderBackend, Wallet where requires STUDENTS);
/// Places a new order for the calling student. The body is a [`PlaceOrderRequest`]. Returns the new order, in
/// `PendingPayment` status, with 201 Created.
pub async fn place_order<B: OrderBackend, W: Wallet>(
    identity: Identity,
    api: web::Data<OrderFlowApi<B, W>>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST place_order for user #{}", identity.user_id);
    let order = api.place_order(identity.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(processable_orders => Get "/orders" impl OrderBackend, Wallet where requires STAFF);
/// The kitchen queue: every paid order that has not yet been collected, oldest first.
pub async fn processable_orders<B: OrderBackend, W: Wallet>(
    api: web::Data<OrderFlowApi<B, W>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET processable_orders");
    let orders = api.processable_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_orders => Get "/orders/my-orders" impl OrderBackend, Wallet where requires STUDENTS);
pub async fn my_orders<B: OrderBackend, W: Wallet>(
    identity: Identity,
    api: web::Data<OrderFlowApi<B, W>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for user #{}", identity.user_id);
    let orders = api.orders_for_user(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_history => Get "/orders/history" impl OrderBackend, Wallet where requires STAFF);
pub async fn order_history<B: OrderBackend, W: Wallet>(
    api: web::Data<OrderFlowApi<B, W>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET order_history");
    let orders = api.order_history().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderBackend, Wallet where requires ANYONE);
/// Students may only see their own orders. Staff can see any order.
pub async fn order_by_id<B: OrderBackend, W: Wallet>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, W>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET order #{order_id} for user #{}", identity.user_id);
    let order = api.fetch_order(order_id).await?;
    if !identity.role.is_staff() && !order.is_owned_by(identity.user_id) {
        return Err(ServerError::InsufficientPermissions(format!("Order {order_id} belongs to another user")));
    }
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order => Put "/orders/{order_id}" impl OrderBackend, Wallet where requires STUDENTS);
/// Replaces the items of one of the caller's unpaid orders.
pub async fn update_order<B: OrderBackend, W: Wallet>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, W>>,
    body: web::Json<UpdateOrderParams>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ PUT update_order #{order_id} for user #{}", identity.user_id);
    let order = api.update_pending_order(identity.user_id, order_id, body.into_inner().items).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(confirm_payment => Post "/orders/{order_id}/confirm-payment" impl OrderBackend, Wallet where requires STUDENTS);
pub async fn confirm_payment<B: OrderBackend, W: Wallet>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, W>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ POST confirm_payment #{order_id} for user #{}", identity.user_id);
    let order = api.confirm_payment(identity.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl OrderBackend, Wallet where requires STUDENTS);
/// Cancels one of the caller's orders. The response includes the amount refunded.
pub async fn cancel_order<B: OrderBackend, W: Wallet>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, W>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ POST cancel_order #{order_id} for user #{}", identity.user_id);
    let result = api.cancel_order(identity.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(progress_order => Post "/orders/{order_id}/progress" impl OrderBackend, Wallet where requires STAFF);
pub async fn progress_order<B: OrderBackend, W: Wallet>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, W>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    info!("💻️ POST progress_order #{order_id} by {} #{}", identity.role, identity.user_id);
    let order = api.progress_order(order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(reject_order => Post "/orders/{order_id}/reject" impl OrderBackend, Wallet where requires STAFF);
pub async fn reject_order<B: OrderBackend, W: Wallet>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, W>>,
    body: web::Json<RejectOrderParams>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    info!("💻️ POST reject_order #{order_id} by {} #{}", identity.role, identity.user_id);
    let order = api.reject_order(order_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(unread_notifications => Get "/notifications/unread" impl NotificationManagement where requires ANYONE);
pub async fn unread_notifications<B: NotificationManagement>(
    identity: Identity,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET unread_notifications for user #{}", identity.user_id);
    let notifications = api.unread_notifications(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(NotificationsResult { notifications }))
}

route!(unread_count => Get "/notifications/unread/count" impl NotificationManagement where requires ANYONE);
pub async fn unread_count<B: NotificationManagement>(
    identity: Identity,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET unread_count for user #{}", identity.user_id);
    let count = api.unread_count(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(UnreadCountResult { count }))
}

route!(mark_all_read => Post "/notifications/mark-all-as-read" impl NotificationManagement where requires ANYONE);
pub async fn mark_all_read<B: NotificationManagement>(
    identity: Identity,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST mark_all_read for user #{}", identity.user_id);
    let count = api.mark_all_as_read(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{count} notifications marked as read"))))
}

//----------------------------------------------   Wallet  ----------------------------------------------------
route!(my_balance => Get "/wallet" impl WalletLedger where requires ANYONE);
pub async fn my_balance<L: WalletLedger>(
    identity: Identity,
    api: web::Data<WalletApi<L>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_balance for user #{}", identity.user_id);
    let balance = api.balance(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResult { balance }))
}

route!(my_wallet_history => Get "/wallet/history" impl WalletLedger where requires ANYONE);
pub async fn my_wallet_history<L: WalletLedger>(
    identity: Identity,
    api: web::Data<WalletApi<L>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_wallet_history for user #{}", identity.user_id);
    wallet_history(identity.user_id, api.as_ref()).await
}

route!(top_up => Post "/wallet/topup" impl WalletLedger where requires ANYONE);
/// Adds funds to the caller's wallet. The amount is a decimal string in major units, e.g. `{"amount": "12.50"}`.
pub async fn top_up<L: WalletLedger>(
    identity: Identity,
    api: web::Data<WalletApi<L>>,
    body: web::Json<TopUpParams>,
) -> Result<HttpResponse, ServerError> {
    let amount = body
        .amount
        .parse::<Money>()
        .map_err(|e| ServerError::InvalidRequest(format!("{} is not a valid amount. {e}", body.amount)))?;
    info!("💻️ POST top_up of {amount} for user #{}", identity.user_id);
    let balance = api.top_up(identity.user_id, amount).await?;
    Ok(HttpResponse::Ok().json(BalanceResult { balance }))
}

route!(student_wallet_history => Get "/wallet/student/{user_id}/history" impl WalletLedger where requires STAFF);
pub async fn student_wallet_history<L: WalletLedger>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<L>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = UserId(path.into_inner());
    debug!("💻️ GET wallet history for user #{user_id}");
    wallet_history(user_id, api.as_ref()).await
}

async fn wallet_history<L: WalletLedger>(user_id: UserId, api: &WalletApi<L>) -> Result<HttpResponse, ServerError> {
    let balance = api.balance(user_id).await?;
    let transactions = api.history(user_id).await?;
    Ok(HttpResponse::Ok().json(WalletHistoryResult { balance, transactions }))
}
