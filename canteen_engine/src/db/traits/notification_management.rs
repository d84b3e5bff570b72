use crate::db_types::{NewNotification, Notification, UserId};

/// Storage for the per-user notification inbox.
#[allow(async_fn_in_trait)]
pub trait NotificationManagement {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, Self::Error>;

    /// Unread notifications for the user, newest first.
    async fn fetch_unread_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, Self::Error>;

    async fn count_unread_notifications(&self, user_id: UserId) -> Result<i64, Self::Error>;

    /// Marks every unread notification for the user as read. Returns the number of notifications updated.
    async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64, Self::Error>;
}
