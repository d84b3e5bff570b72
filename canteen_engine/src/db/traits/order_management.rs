use crate::{
    canteen_api::order_objects::OrderQueryFilter,
    db_types::{Order, OrderId},
};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the database backend.
/// None of these methods modify the database.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches the order, along with its line items. Returns `None` if the order does not exist.
    async fn fetch_order_by_id(&self, order_id: OrderId) -> Result<Option<Order>, Self::Error>;

    /// Fetches all orders matching the filter, along with their line items, in the order requested by the filter.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, Self::Error>;
}
