use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::db_types::{MenuItem, MenuItemId, Money, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType};

/// The highest level of behaviour for backends supporting the canteen engine. A backend hands out units of work; the
/// engine drives all of its multi-row changes through them.
#[allow(async_fn_in_trait)]
pub trait CanteenDatabase: Clone {
    type Error: std::error::Error + Send + Sync + 'static;
    type Transaction: OrderTransaction<Error = Self::Error>;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Transaction, Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// The mutations available inside a single unit of work.
///
/// Backends that take write locks lazily (e.g. SQLite) must be able to serialise competing writers on the first
/// statement of the unit of work. The engine therefore always opens a unit of work with a write
/// ([`Self::transition_status`], [`Self::claim_order`], [`Self::reserve_stock`] or [`Self::expire_orders`]) and only
/// reads afterwards.
#[allow(async_fn_in_trait)]
pub trait OrderTransaction {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Moves the order from `from` to `to`, but only if it is currently in status `from`. If `rejection_reason` is
    /// given, it is stored with the order.
    ///
    /// Returns `false` if the order does not exist or was not in status `from`. Nothing is changed in that case.
    async fn transition_status(
        &mut self,
        order_id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
        rejection_reason: Option<&str>,
    ) -> Result<bool, Self::Error>;

    /// Takes the write lock on an order that is expected to be in the given status, without changing the status.
    /// Returns `false` if the order is not in that status.
    async fn claim_order(&mut self, order_id: OrderId, expected: OrderStatusType) -> Result<bool, Self::Error>;

    /// Decrements the stock of a menu item by `quantity`, but only if at least that many units are available.
    /// Returns `false` (and changes nothing) if the item does not exist or the stock is insufficient.
    async fn reserve_stock(&mut self, item_id: MenuItemId, quantity: i64) -> Result<bool, Self::Error>;

    /// Returns `quantity` units to the stock of a menu item. This is an atomic delta, never a full overwrite.
    async fn release_stock(&mut self, item_id: MenuItemId, quantity: i64) -> Result<(), Self::Error>;

    /// Fetches the menu items with the given ids. Missing ids are absent from the map.
    async fn fetch_menu_items(&mut self, ids: &[MenuItemId]) -> Result<HashMap<MenuItemId, MenuItem>, Self::Error>;

    /// Stores a new order, along with its line items, in status `PendingPayment`. Returns the new order id.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, Self::Error>;

    /// Fetches an order along with its line items.
    async fn fetch_order(&mut self, order_id: OrderId) -> Result<Option<Order>, Self::Error>;

    async fn fetch_order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, Self::Error>;

    /// Removes all line items from the order, and replaces them with `items`. The order's total and order date are
    /// overwritten as well.
    async fn replace_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
        total_price: Money,
        order_date: DateTime<Utc>,
    ) -> Result<(), Self::Error>;

    /// Moves every `PendingPayment` order placed before `cutoff` to `Cancelled`, storing `reason` as the rejection
    /// reason. Returns the ids of the orders that were cancelled.
    async fn expire_orders(&mut self, cutoff: DateTime<Utc>, reason: &str) -> Result<Vec<OrderId>, Self::Error>;

    /// Makes every change in this unit of work permanent.
    async fn commit(self) -> Result<(), Self::Error>;

    /// Discards every change in this unit of work.
    async fn rollback(self) -> Result<(), Self::Error>;
}
