use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use super::{menu_items, orders, SqliteDatabaseError};
use crate::{
    db::traits::OrderTransaction,
    db_types::{MenuItem, MenuItemId, Money, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType},
};

/// A unit of work on the SQLite backend. If this is dropped without calling `commit`, every change is rolled back.
pub struct SqliteOrderTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteOrderTransaction {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }
}

impl OrderTransaction for SqliteOrderTransaction {
    type Error = SqliteDatabaseError;

    async fn transition_status(
        &mut self,
        order_id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
        rejection_reason: Option<&str>,
    ) -> Result<bool, Self::Error> {
        orders::transition_status(order_id, from, to, rejection_reason, &mut self.tx).await
    }

    async fn claim_order(&mut self, order_id: OrderId, expected: OrderStatusType) -> Result<bool, Self::Error> {
        orders::claim_order(order_id, expected, &mut self.tx).await
    }

    async fn reserve_stock(&mut self, item_id: MenuItemId, quantity: i64) -> Result<bool, Self::Error> {
        menu_items::reserve_stock(item_id, quantity, &mut self.tx).await
    }

    async fn release_stock(&mut self, item_id: MenuItemId, quantity: i64) -> Result<(), Self::Error> {
        menu_items::release_stock(item_id, quantity, &mut self.tx).await
    }

    async fn fetch_menu_items(&mut self, ids: &[MenuItemId]) -> Result<HashMap<MenuItemId, MenuItem>, Self::Error> {
        menu_items::fetch_menu_items(ids, &mut self.tx).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, Self::Error> {
        orders::insert_order(order, &mut self.tx).await
    }

    async fn fetch_order(&mut self, order_id: OrderId) -> Result<Option<Order>, Self::Error> {
        orders::fetch_order_by_id(order_id, &mut self.tx).await
    }

    async fn fetch_order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, Self::Error> {
        orders::fetch_order_items(order_id, &mut self.tx).await
    }

    async fn replace_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
        total_price: Money,
        order_date: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        orders::replace_order_items(order_id, items, total_price, order_date, &mut self.tx).await
    }

    async fn expire_orders(&mut self, cutoff: DateTime<Utc>, reason: &str) -> Result<Vec<OrderId>, Self::Error> {
        orders::expire_orders(cutoff, reason, &mut self.tx).await
    }

    async fn commit(self) -> Result<(), Self::Error> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Self::Error> {
        self.tx.rollback().await?;
        Ok(())
    }
}
