use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    canteen_api::order_objects::{OrderQueryFilter, SortOrder},
    db::sqlite::SqliteDatabaseError,
    db_types::{Money, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType},
};

const ORDER_COLUMNS: &str =
    "order_id, user_id, order_date, pickup_time, total_price, status, rejection_reason FROM orders";

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<OrderId, SqliteDatabaseError> {
    let order_id: OrderId = sqlx::query_scalar(
        r#"
            INSERT INTO orders (user_id, order_date, pickup_time, total_price, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING order_id;
        "#,
    )
    .bind(order.user_id)
    .bind(order.order_date)
    .bind(order.pickup_time)
    .bind(order.total_price)
    .bind(OrderStatusType::PendingPayment.to_string())
    .fetch_one(&mut *conn)
    .await?;
    insert_order_items(order_id, &order.items, conn).await?;
    debug!("🗃️ Order #{order_id} saved with {} line items", order.items.len());
    Ok(order_id)
}

async fn insert_order_items(
    order_id: OrderId,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    if items.is_empty() {
        return Ok(());
    }
    let mut builder =
        QueryBuilder::<Sqlite>::new("INSERT INTO order_items (order_id, menu_item_id, quantity, price_at_time_of_order) ");
    builder.push_values(items, |mut row, item| {
        row.push_bind(order_id)
            .push_bind(item.menu_item_id)
            .push_bind(item.quantity)
            .push_bind(item.price_at_time_of_order);
    });
    builder.build().execute(conn).await?;
    Ok(())
}

/// Returns the order with the given id, along with its line items.
pub async fn fetch_order_by_id(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} WHERE order_id = $1"))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    match order {
        Some(mut order) => {
            order.items = fetch_order_items(order_id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

pub async fn fetch_order_items(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, SqliteDatabaseError> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
            SELECT order_item_id, order_id, menu_item_id, quantity, price_at_time_of_order
            FROM order_items
            WHERE order_id = $1
            ORDER BY order_item_id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Conditionally moves an order from one status to another. This is the compare-and-swap that serialises competing
/// operations on the same order. Returns `true` if the order was in status `from` and has been updated.
pub async fn transition_status(
    order_id: OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    rejection_reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders
            SET status = $1, rejection_reason = COALESCE($2, rejection_reason), updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND status = $4
        "#,
    )
    .bind(to.to_string())
    .bind(rejection_reason)
    .bind(order_id)
    .bind(from.to_string())
    .execute(conn)
    .await?;
    let swapped = result.rows_affected() == 1;
    trace!("🗃️ Order #{order_id} {from} -> {to}: {}", if swapped { "updated" } else { "unchanged" });
    Ok(swapped)
}

/// Touches the order row if it is in the expected status, taking the write lock for the current transaction.
pub async fn claim_order(
    order_id: OrderId,
    expected: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE orders SET updated_at = CURRENT_TIMESTAMP WHERE order_id = $1 AND status = $2")
        .bind(order_id)
        .bind(expected.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn replace_order_items(
    order_id: OrderId,
    items: &[NewOrderItem],
    total_price: Money,
    order_date: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let removed = sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order_id).execute(&mut *conn).await?;
    trace!("🗃️ Removed {} line items from order #{order_id}", removed.rows_affected());
    insert_order_items(order_id, items, &mut *conn).await?;
    let result = sqlx::query(
        "UPDATE orders SET total_price = $1, order_date = $2, updated_at = CURRENT_TIMESTAMP WHERE order_id = $3",
    )
    .bind(total_price)
    .bind(order_date)
    .bind(order_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::OrderNotFound(order_id));
    }
    Ok(())
}

/// Cancels every unpaid order placed before `cutoff` in a single statement, and returns the ids of the orders that
/// were cancelled.
pub async fn expire_orders(
    cutoff: DateTime<Utc>,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderId>, SqliteDatabaseError> {
    let ids = sqlx::query_scalar::<_, OrderId>(
        r#"
            UPDATE orders
            SET status = $1, rejection_reason = $2, updated_at = CURRENT_TIMESTAMP
            WHERE status = $3 AND julianday(order_date) < julianday($4)
            RETURNING order_id
        "#,
    )
    .bind(OrderStatusType::Cancelled.to_string())
    .bind(reason)
    .bind(OrderStatusType::PendingPayment.to_string())
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`, along with their line items.
pub async fn search_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(since) = query.since {
        where_clause.push("julianday(order_date) >= julianday(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("julianday(order_date) <= julianday(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    if let Some(statuses) = query.status.as_ref().filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.to_string());
        }
        where_clause.push_unseparated(")");
    }
    match query.sort {
        SortOrder::OldestFirst => builder.push(" ORDER BY julianday(order_date) ASC, order_id ASC"),
        SortOrder::NewestFirst => builder.push(" ORDER BY julianday(order_date) DESC, order_id DESC"),
    };
    trace!("🗃️ Executing query: {}", builder.sql());
    let mut orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    let ids = orders.iter().map(|o| o.order_id).collect::<Vec<_>>();
    let mut items = fetch_items_for_orders(&ids, conn).await?;
    for order in &mut orders {
        order.items = items.remove(&order.order_id).unwrap_or_default();
    }
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

async fn fetch_items_for_orders(
    ids: &[OrderId],
    conn: &mut SqliteConnection,
) -> Result<HashMap<OrderId, Vec<OrderItem>>, SqliteDatabaseError> {
    let mut result: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    if ids.is_empty() {
        return Ok(result);
    }
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT order_item_id, order_id, menu_item_id, quantity, price_at_time_of_order FROM order_items WHERE \
         order_id IN (",
    );
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(") ORDER BY order_item_id ASC");
    let items = builder.build_query_as::<OrderItem>().fetch_all(conn).await?;
    for item in items {
        result.entry(item.order_id).or_default().push(item);
    }
    Ok(result)
}
