use std::{collections::HashMap, fmt::Debug};

use log::*;
use sqlx::SqlitePool;

use super::{db_url, menu_items, new_pool, notifications, orders, SqliteDatabaseError, SqliteOrderTransaction};
use crate::{
    canteen_api::order_objects::OrderQueryFilter,
    db::traits::{CanteenDatabase, CatalogManagement, NotificationManagement, OrderManagement},
    db_types::{MenuItem, MenuItemId, NewMenuItem, NewNotification, Notification, Order, OrderId, UserId},
};

const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CanteenDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;
    type Transaction = SqliteOrderTransaction;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        let tx = self.pool.begin().await?;
        Ok(SqliteOrderTransaction::new(tx))
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_order_by_id(&self, order_id: OrderId) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(order_id, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }
}

impl CatalogManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        menu_items::insert_menu_item(item, &mut conn).await
    }

    async fn fetch_menu_items(&self, ids: &[MenuItemId]) -> Result<HashMap<MenuItemId, MenuItem>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        menu_items::fetch_menu_items(ids, &mut conn).await
    }

    async fn adjust_inventory(&self, item_id: MenuItemId, delta: i64) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let stock = menu_items::adjust_inventory(item_id, delta, &mut conn).await?;
        debug!("🗃️ Stock of menu item #{item_id} adjusted by {delta} to {stock}");
        Ok(stock)
    }
}

impl NotificationManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let result = notifications::insert_notification(notification, &mut conn).await?;
        trace!("🗃️ Notification #{} stored for user #{}", result.id, result.user_id);
        Ok(result)
    }

    async fn fetch_unread_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notifications::fetch_unread(user_id, &mut conn).await
    }

    async fn count_unread_notifications(&self, user_id: UserId) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notifications::count_unread(user_id, &mut conn).await
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_all_read(user_id, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `CANTEEN_DATABASE_URL`.
    pub async fn new() -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date using the embedded migrations.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete for {}", self.url);
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
