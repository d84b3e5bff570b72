use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewNotification, Notification, UserId},
};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, Notification>(
        r#"
            INSERT INTO notifications (user_id, message, link, is_read, created_at) VALUES ($1, $2, $3, 0, $4)
            RETURNING id, user_id, message, link, is_read, created_at
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.message)
    .bind(notification.link)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_unread(user_id: UserId, conn: &mut SqliteConnection) -> Result<Vec<Notification>, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, Notification>(
        r#"
            SELECT id, user_id, message, link, is_read, created_at FROM notifications
            WHERE user_id = $1 AND is_read = 0
            ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(result)
}

pub async fn count_unread(user_id: UserId, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = 0")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn mark_all_read(user_id: UserId, conn: &mut SqliteConnection) -> Result<u64, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = $1 AND is_read = 0")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
