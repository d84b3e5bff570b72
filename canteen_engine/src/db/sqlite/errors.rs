use thiserror::Error;

use crate::db_types::{MenuItemId, OrderId};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(MenuItemId),
    #[error("Stock for menu item {item_id} cannot be adjusted by {delta}")]
    InventoryUnderflow { item_id: MenuItemId, delta: i64 },
}
