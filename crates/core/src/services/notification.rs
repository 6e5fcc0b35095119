//! In-app notification service.

use bailiff_common::{AppError, AppResult};
use bailiff_db::{
    entities::notification,
    repositories::{NotificationQuery, NotificationRepository},
};

/// Largest page a client may request.
const MAX_PAGE_SIZE: u64 = 100;

/// Listing options.
#[derive(Debug, Clone, Default)]
pub struct ListNotificationsInput {
    /// Page size; defaults to 20.
    pub limit: Option<u64>,
    /// Return notifications older than this ID.
    pub until_id: Option<String>,
    /// Only unread notifications.
    pub unread_only: bool,
    /// Include archived notifications.
    pub include_archived: bool,
}

/// Notification service for a recipient's own inbox.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self { notification_repo }
    }

    /// List the user's notifications, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        input: &ListNotificationsInput,
    ) -> AppResult<Vec<notification::Model>> {
        let limit = input.limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
        self.notification_repo
            .find_by_user(
                user_id,
                NotificationQuery {
                    limit,
                    until_id: input.until_id.as_deref(),
                    unread_only: input.unread_only,
                    include_archived: input.include_archived,
                },
            )
            .await
    }

    /// Count unread notifications.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Mark one notification read. Already-read notifications are left as is.
    pub async fn mark_read(&self, user_id: &str, id: &str) -> AppResult<()> {
        if self.notification_repo.mark_as_read(id, user_id).await? {
            return Ok(());
        }
        self.ensure_owned(user_id, id).await
    }

    /// Mark every notification read. Returns how many changed.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Archive a notification.
    pub async fn archive(&self, user_id: &str, id: &str) -> AppResult<()> {
        if self.notification_repo.archive(id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Notification {id}")))
        }
    }

    /// Delete a notification.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        if self.notification_repo.delete(id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Notification {id}")))
        }
    }

    async fn ensure_owned(&self, user_id: &str, id: &str) -> AppResult<()> {
        match self.notification_repo.find_by_id(id).await? {
            Some(n) if n.recipient_id == user_id => Ok(()),
            _ => Err(AppError::NotFound(format!("Notification {id}"))),
        }
    }
}
