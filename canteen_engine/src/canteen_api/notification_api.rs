use std::fmt::Debug;

use log::*;

use crate::{
    canteen_api::errors::NotificationApiError,
    db::traits::NotificationManagement,
    db_types::{NewNotification, Notification, UserId},
    events::NotificationEvent,
};

/// Read and manage a user's notification inbox.
#[derive(Clone)]
pub struct NotificationApi<B> {
    db: B,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B> NotificationApi<B>
where B: NotificationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Stores a notification delivered through the event hooks.
    pub async fn deliver(&self, event: NotificationEvent) -> Result<Notification, NotificationApiError> {
        let mut notification = NewNotification::new(event.user_id, event.message);
        notification.link = event.link;
        let result = self
            .db
            .insert_notification(notification)
            .await
            .map_err(|e| NotificationApiError::DatabaseError(e.to_string()))?;
        debug!("📬️ Notification #{} delivered to user #{}", result.id, result.user_id);
        Ok(result)
    }

    pub async fn unread_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, NotificationApiError> {
        self.db
            .fetch_unread_notifications(user_id)
            .await
            .map_err(|e| NotificationApiError::DatabaseError(e.to_string()))
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, NotificationApiError> {
        self.db
            .count_unread_notifications(user_id)
            .await
            .map_err(|e| NotificationApiError::DatabaseError(e.to_string()))
    }

    /// Returns the number of notifications that were marked as read.
    pub async fn mark_all_as_read(&self, user_id: UserId) -> Result<u64, NotificationApiError> {
        let count = self
            .db
            .mark_all_notifications_read(user_id)
            .await
            .map_err(|e| NotificationApiError::DatabaseError(e.to_string()))?;
        trace!("📬️ {count} notifications marked as read for user #{user_id}");
        Ok(count)
    }
}
