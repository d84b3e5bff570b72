use std::collections::HashMap;

use crate::db_types::{MenuItem, MenuItemId, NewMenuItem};

/// The engine's view of the catalog. Menu management proper lives outside the engine; this trait only covers what the
/// order flow needs (batch lookups and atomic stock deltas), plus inserting items so that a catalog can be seeded.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn insert_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, Self::Error>;

    /// Fetches the menu items with the given ids in a single query. Missing ids are absent from the map.
    async fn fetch_menu_items(&self, ids: &[MenuItemId]) -> Result<HashMap<MenuItemId, MenuItem>, Self::Error>;

    /// Adds `delta` (which may be negative) to the stock of a menu item and returns the new stock level. Fails if the
    /// item does not exist, or if the change would take the stock below zero.
    async fn adjust_inventory(&self, item_id: MenuItemId, delta: i64) -> Result<i64, Self::Error>;
}
