use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use canteen_engine::{
    db_types::{MenuItemId, Money, NewMenuItem, Role},
    events::EventProducers,
    CatalogManagement,
    NotificationApi,
    OrderFlowApi,
    SqliteDatabase,
    SqliteWallet,
    Wallet,
    WalletApi,
    WalletLedger,
};
use log::debug;
use tempfile::TempDir;

use crate::{
    auth::{USER_ID_HEADER, USER_ROLE_HEADER},
    routes::*,
};

/// A migrated canteen database in a temporary directory. The directory is removed when this is dropped.
pub struct TestBackend {
    dir: TempDir,
    pub db: SqliteDatabase,
}

impl TestBackend {
    pub async fn new() -> Self {
        let _ = env_logger::try_init();
        let dir = tempfile::tempdir().expect("Could not create temporary directory");
        let url = format!("sqlite://{}", dir.path().join("canteen.db").display());
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        db.migrate().await.expect("Error running DB migrations");
        Self { dir, db }
    }

    /// A wallet ledger living next to the canteen database.
    pub async fn wallet(&self) -> SqliteWallet {
        let url = format!("sqlite://{}", self.dir.path().join("wallet.db").display());
        let wallet = SqliteWallet::new_with_url(&url, 5).await.expect("Error creating wallet database");
        wallet.migrate().await.expect("Error running wallet migrations");
        wallet
    }

    pub async fn add_menu_item(&self, name: &str, price: i64, stock: i64) -> MenuItemId {
        let item = NewMenuItem::new(name, Money::from(price), stock);
        self.db.insert_menu_item(item).await.expect("Error adding menu item").item_id
    }

    pub fn order_flow<W: Wallet>(&self, wallet: W) -> web::Data<OrderFlowApi<SqliteDatabase, W>> {
        web::Data::new(OrderFlowApi::new(self.db.clone(), wallet, EventProducers::default()))
    }
}

pub fn as_user(req: TestRequest, user_id: i64, role: Role) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id.to_string())).insert_header((USER_ROLE_HEADER, role.to_string()))
}

pub fn student(req: TestRequest, user_id: i64) -> TestRequest {
    as_user(req, user_id, Role::Student)
}

pub fn staff(req: TestRequest) -> TestRequest {
    as_user(req, 100, Role::CanteenStaff)
}

/// Mounts the order routes under `/api`, the way the server does.
pub fn order_routes<W: Wallet + 'static>(
    api: web::Data<OrderFlowApi<SqliteDatabase, W>>,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api).service(health).service(
            web::scope("/api")
                .service(PlaceOrderRoute::<SqliteDatabase, W>::new())
                .service(ProcessableOrdersRoute::<SqliteDatabase, W>::new())
                .service(MyOrdersRoute::<SqliteDatabase, W>::new())
                .service(OrderHistoryRoute::<SqliteDatabase, W>::new())
                .service(OrderByIdRoute::<SqliteDatabase, W>::new())
                .service(UpdateOrderRoute::<SqliteDatabase, W>::new())
                .service(ConfirmPaymentRoute::<SqliteDatabase, W>::new())
                .service(CancelOrderRoute::<SqliteDatabase, W>::new())
                .service(ProgressOrderRoute::<SqliteDatabase, W>::new())
                .service(RejectOrderRoute::<SqliteDatabase, W>::new()),
        );
    }
}

pub fn wallet_routes<L: WalletLedger + 'static>(api: web::Data<WalletApi<L>>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api).service(
            web::scope("/api")
                .service(MyBalanceRoute::<L>::new())
                .service(MyWalletHistoryRoute::<L>::new())
                .service(TopUpRoute::<L>::new())
                .service(StudentWalletHistoryRoute::<L>::new()),
        );
    }
}

pub fn notification_routes(api: web::Data<NotificationApi<SqliteDatabase>>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api).service(
            web::scope("/api")
                .service(UnreadNotificationsRoute::<SqliteDatabase>::new())
                .service(UnreadCountRoute::<SqliteDatabase>::new())
                .service(MarkAllReadRoute::<SqliteDatabase>::new()),
        );
    }
}

/// Builds a fresh app from `configure`, sends it the request and returns the status and body of the response. Errors
/// raised by middleware are rendered the way the server would render them.
pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    call(&app, req.to_request()).await
}

async fn call<S, R, B>(app: &S, req: R) -> (StatusCode, String)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            debug!("Request failed in middleware: {e}");
            let res = e.error_response();
            let status = res.status();
            let body = actix_web::body::to_bytes(res.into_body()).await.unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}
