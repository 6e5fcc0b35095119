//! Absence reason repository.

use std::sync::Arc;

use super::db_err;
use crate::entities::{
    AbsenceReason,
    absence_reason::{self, ReasonStatus},
};
use bailiff_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

/// Absence reason repository for database operations.
#[derive(Clone)]
pub struct AbsenceReasonRepository {
    db: Arc<DatabaseConnection>,
}

impl AbsenceReasonRepository {
    /// Create a new absence reason repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reason by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<absence_reason::Model>> {
        AbsenceReason::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a reason by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<absence_reason::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Absence reason {id}")))
    }

    /// Reasons filed against one attendance record.
    pub async fn find_by_attendance(
        &self,
        attendance_id: &str,
    ) -> AppResult<Vec<absence_reason::Model>> {
        AbsenceReason::find()
            .filter(absence_reason::Column::AttendanceId.eq(attendance_id))
            .order_by_desc(absence_reason::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List reasons, newest first.
    pub async fn list(
        &self,
        status: Option<ReasonStatus>,
        user_id: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<absence_reason::Model>> {
        let mut query = AbsenceReason::find().order_by_desc(absence_reason::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(absence_reason::Column::Status.eq(status));
        }
        if let Some(user_id) = user_id {
            query = query.filter(absence_reason::Column::UserId.eq(user_id));
        }

        query
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new reason.
    pub async fn create(
        &self,
        model: absence_reason::ActiveModel,
    ) -> AppResult<absence_reason::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Update a reason.
    pub async fn update(
        &self,
        model: absence_reason::ActiveModel,
    ) -> AppResult<absence_reason::Model> {
        model.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Record that the submission fan-out went out.
    pub async fn mark_notification_sent(&self, id: &str) -> AppResult<()> {
        AbsenceReason::update_many()
            .col_expr(absence_reason::Column::NotificationSent, Expr::value(true))
            .filter(absence_reason::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
