use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use canteen_engine::{
    clock::ManualClock,
    db_types::{MenuItemId, Money, NewMenuItem, UserId},
    events::{EventHandlers, EventHooks, EventProducers, NotificationEvent},
    CanteenDatabase,
    CatalogManagement,
    OrderFlowApi,
    SqliteDatabase,
    SqliteWallet,
    Wallet,
    WalletLedger,
};
use chrono::{DateTime, TimeZone, Utc};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/canteen_it_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    let _ = Sqlite::drop_database(url).await;
    Sqlite::create_database(url).await.expect("Error creating database");
    trace!("Created Sqlite database {url}");
}

pub async fn prepare_database(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    db
}

pub async fn prepare_wallet(url: &str) -> SqliteWallet {
    create_database(url).await;
    let wallet = SqliteWallet::new_with_url(url, 5).await.expect("Error creating connection to wallet database");
    wallet.migrate().await.expect("Error running wallet migrations");
    wallet
}

/// Monday lunchtime. All test scenarios start here.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
}

/// Collects every notification sent through the event hooks.
#[derive(Clone, Default)]
pub struct Inbox {
    messages: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl Inbox {
    pub fn hooks(&self) -> EventHooks {
        let sink = self.messages.clone();
        let mut hooks = EventHooks::default();
        hooks.on_notification(move |ev| {
            let sink = sink.clone();
            Box::pin(async move {
                sink.lock().unwrap().push(ev);
            })
        });
        hooks
    }

    pub fn messages_for(&self, user_id: UserId) -> Vec<String> {
        self.messages.lock().unwrap().iter().filter(|m| m.user_id == user_id).map(|m| m.message.clone()).collect()
    }

    /// Notifications are delivered asynchronously. Waits up to two seconds for the user to have `count` of them.
    pub async fn wait_for(&self, user_id: UserId, count: usize) -> Vec<String> {
        for _ in 0..40 {
            let messages = self.messages_for(user_id);
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(StdDuration::from_millis(50)).await;
        }
        self.messages_for(user_id)
    }
}

/// A complete canteen on throwaway databases, with a clock that only moves when told to.
pub struct TestSystem<W = SqliteWallet> {
    pub db_path: String,
    pub api: OrderFlowApi<SqliteDatabase, W>,
    pub clock: ManualClock,
    pub inbox: Inbox,
}

impl<W> Debug for TestSystem<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TestSystem({})", self.db_path)
    }
}

impl TestSystem<SqliteWallet> {
    pub async fn new() -> Self {
        let wallet = prepare_wallet(&random_db_path()).await;
        Self::with_wallet(wallet).await
    }

    pub async fn top_up(&self, user_id: UserId, amount: &str) {
        let amount = amount.parse::<Money>().expect("Invalid amount");
        self.api.wallet().top_up(user_id, amount).await.expect("Error topping up wallet");
    }

    pub async fn balance(&self, user_id: UserId) -> Money {
        self.api.wallet().balance(user_id).await.expect("Error fetching balance")
    }

    pub async fn tear_down(mut self) {
        self.api.wallet().close().await;
        let wallet_url = self.api.wallet().url().to_string();
        let _ = Sqlite::drop_database(&wallet_url).await;
        self.close_db().await;
    }
}

impl<W: Wallet> TestSystem<W> {
    pub async fn with_wallet(wallet: W) -> Self {
        let db_path = random_db_path();
        let db = prepare_database(&db_path).await;
        let inbox = Inbox::default();
        let handlers = EventHandlers::new(64, inbox.hooks());
        let producers: EventProducers = handlers.producers();
        handlers.start_handlers().await;
        let clock = ManualClock::new(start_time());
        let api = OrderFlowApi::new(db, wallet, producers).with_clock(clock.clock());
        Self { db_path, api, clock, inbox }
    }

    pub async fn add_menu_item(&self, name: &str, price: &str, stock: i64) -> MenuItemId {
        let price = price.parse::<Money>().expect("Invalid price");
        let item = self.api.db().insert_menu_item(NewMenuItem::new(name, price, stock)).await.expect("Error adding item");
        item.item_id
    }

    pub async fn stock(&self, item_id: MenuItemId) -> i64 {
        let items = self.api.db().fetch_menu_items(&[item_id]).await.expect("Error fetching menu item");
        items.get(&item_id).map(|i| i.inventory_quantity).expect("Menu item does not exist")
    }

    pub fn advance(&self, minutes: i64, seconds: i64) {
        self.clock.advance(chrono::Duration::minutes(minutes) + chrono::Duration::seconds(seconds));
    }

    pub async fn close_db(&mut self) {
        if let Err(e) = self.api.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        let _ = Sqlite::drop_database(&self.db_path).await;
    }
}
