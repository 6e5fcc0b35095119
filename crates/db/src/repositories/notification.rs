//! Notification repository.

use std::sync::Arc;

use super::db_err;
use crate::entities::{Notification, notification};
use bailiff_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Listing options for a recipient's notifications.
#[derive(Debug, Clone, Copy)]
pub struct NotificationQuery<'a> {
    /// Page size.
    pub limit: u64,
    /// Return notifications older than this ID.
    pub until_id: Option<&'a str>,
    /// Only unread notifications.
    pub unread_only: bool,
    /// Include archived notifications.
    pub include_archived: bool,
}

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Delete a notification owned by `recipient_id`.
    pub async fn delete(&self, id: &str, recipient_id: &str) -> AppResult<bool> {
        let result = Notification::delete_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Get notifications for a user (paginated, newest first).
    pub async fn find_by_user(
        &self,
        user_id: &str,
        query: NotificationQuery<'_>,
    ) -> AppResult<Vec<notification::Model>> {
        let mut select = Notification::find()
            .filter(notification::Column::RecipientId.eq(user_id))
            .order_by_desc(notification::Column::Id);

        if let Some(id) = query.until_id {
            select = select.filter(notification::Column::Id.lt(id));
        }

        if query.unread_only {
            select = select.filter(notification::Column::IsRead.eq(false));
        }

        if !query.include_archived {
            select = select.filter(notification::Column::IsArchived.eq(false));
        }

        select
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark one of the recipient's notifications as read.
    pub async fn mark_as_read(&self, id: &str, recipient_id: &str) -> AppResult<bool> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
            .filter(notification::Column::RecipientId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Archive one of the recipient's notifications.
    pub async fn archive(&self, id: &str, recipient_id: &str) -> AppResult<bool> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsArchived, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Count unread, unarchived notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::RecipientId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .filter(notification::Column::IsArchived.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
