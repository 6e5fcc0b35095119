//! Witness repository.

use std::sync::Arc;

use super::db_err;
use crate::entities::{Witness, witness};
use bailiff_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Witness repository for database operations.
#[derive(Clone)]
pub struct WitnessRepository {
    db: Arc<DatabaseConnection>,
}

impl WitnessRepository {
    /// Create a new witness repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Attach a witness to a case.
    pub async fn create(&self, model: witness::ActiveModel) -> AppResult<witness::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Witnesses attached to a case.
    pub async fn find_by_case(&self, case_id: &str) -> AppResult<Vec<witness::Model>> {
        Witness::find()
            .filter(witness::Column::CaseId.eq(case_id))
            .order_by_asc(witness::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of the cases a user is a witness in.
    pub async fn find_case_ids_for_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        Witness::find()
            .select_only()
            .column(witness::Column::CaseId)
            .filter(witness::Column::UserId.eq(user_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
