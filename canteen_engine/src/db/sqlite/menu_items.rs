use std::collections::HashMap;

use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{MenuItem, MenuItemId, NewMenuItem},
};

pub async fn insert_menu_item(item: NewMenuItem, conn: &mut SqliteConnection) -> Result<MenuItem, SqliteDatabaseError> {
    let item = sqlx::query_as::<_, MenuItem>(
        r#"
            INSERT INTO menu_items (name, price, inventory_quantity) VALUES ($1, $2, $3)
            RETURNING item_id, name, price, inventory_quantity
        "#,
    )
    .bind(item.name)
    .bind(item.price)
    .bind(item.inventory_quantity)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Menu item #{} '{}' added with {} units in stock", item.item_id, item.name, item.inventory_quantity);
    Ok(item)
}

/// Fetches all the requested menu items with a single query.
pub async fn fetch_menu_items(
    ids: &[MenuItemId],
    conn: &mut SqliteConnection,
) -> Result<HashMap<MenuItemId, MenuItem>, SqliteDatabaseError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut builder =
        QueryBuilder::<Sqlite>::new("SELECT item_id, name, price, inventory_quantity FROM menu_items WHERE item_id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(")");
    let items = builder.build_query_as::<MenuItem>().fetch_all(conn).await?;
    trace!("🗃️ Fetched {} of {} requested menu items", items.len(), ids.len());
    Ok(items.into_iter().map(|item| (item.item_id, item)).collect())
}

/// Takes `quantity` units out of stock if, and only if, that many are available. The check and the decrement happen in
/// one statement, so two concurrent reservations can never both succeed on the last units.
pub async fn reserve_stock(
    item_id: MenuItemId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE menu_items
            SET inventory_quantity = inventory_quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE item_id = $2 AND inventory_quantity >= $1
        "#,
    )
    .bind(quantity)
    .bind(item_id)
    .execute(conn)
    .await?;
    let reserved = result.rows_affected() == 1;
    trace!("🗃️ Reserve {quantity} x item #{item_id}: {}", if reserved { "ok" } else { "refused" });
    Ok(reserved)
}

pub async fn release_stock(
    item_id: MenuItemId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE menu_items
            SET inventory_quantity = inventory_quantity + $1, updated_at = CURRENT_TIMESTAMP
            WHERE item_id = $2
        "#,
    )
    .bind(quantity)
    .bind(item_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::MenuItemNotFound(item_id));
    }
    trace!("🗃️ Released {quantity} x item #{item_id} back into stock");
    Ok(())
}

/// Applies a signed stock delta and returns the new stock level.
pub async fn adjust_inventory(
    item_id: MenuItemId,
    delta: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query_scalar::<_, i64>(
        r#"
            UPDATE menu_items
            SET inventory_quantity = inventory_quantity + $1, updated_at = CURRENT_TIMESTAMP
            WHERE item_id = $2 AND inventory_quantity + $1 >= 0
            RETURNING inventory_quantity
        "#,
    )
    .bind(delta)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;
    match result {
        Some(stock) => Ok(stock),
        None => {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM menu_items WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(conn)
                .await?;
            if exists == 0 {
                Err(SqliteDatabaseError::MenuItemNotFound(item_id))
            } else {
                Err(SqliteDatabaseError::InventoryUnderflow { item_id, delta })
            }
        },
    }
}
