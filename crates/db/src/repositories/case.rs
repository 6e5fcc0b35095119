//! Court case repository.

use std::sync::Arc;

use super::db_err;
use crate::entities::{
    Case,
    attendance::AttendanceStatus,
    case::{self, CaseStatus},
};
use bailiff_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Filters for listing cases.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Only cases in this status.
    pub status: Option<CaseStatus>,
    /// Only cases where this user is the investigating or liaison officer.
    pub officer_id: Option<String>,
    /// Only these cases (witness scoping).
    pub case_ids: Option<Vec<String>>,
}

/// Case repository for database operations.
#[derive(Clone)]
pub struct CaseRepository {
    db: Arc<DatabaseConnection>,
}

impl CaseRepository {
    /// Create a new case repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a case by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<case::Model>> {
        Case::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a case by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<case::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Case {id}")))
    }

    /// List cases, newest first.
    pub async fn list(
        &self,
        filter: &CaseFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<case::Model>> {
        let mut query = Case::find().order_by_desc(case::Column::CreatedAt);

        if let Some(status) = filter.status {
            query = query.filter(case::Column::Status.eq(status));
        }

        if let Some(officer_id) = &filter.officer_id {
            query = query.filter(
                Condition::any()
                    .add(case::Column::InvestigatingOfficerId.eq(officer_id.as_str()))
                    .add(case::Column::LiaisonOfficerId.eq(officer_id.as_str())),
            );
        }

        if let Some(ids) = &filter.case_ids {
            if ids.is_empty() {
                return Ok(vec![]);
            }
            query = query.filter(case::Column::Id.is_in(ids.clone()));
        }

        query
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new case.
    pub async fn create(&self, model: case::ActiveModel) -> AppResult<case::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Update a case.
    pub async fn update(&self, model: case::ActiveModel) -> AppResult<case::Model> {
        model.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Delete a case. Hearings, attendance and witness links cascade.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Case::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Mirror the latest attendance mark onto the case.
    pub async fn set_attendance_status(
        &self,
        case_id: &str,
        status: AttendanceStatus,
    ) -> AppResult<()> {
        Case::update_many()
            .col_expr(case::Column::AttendanceStatus, Expr::value(status.as_str()))
            .col_expr(case::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(case::Column::Id.eq(case_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_list_with_empty_case_ids_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = CaseRepository::new(db);

        let filter = CaseFilter {
            case_ids: Some(vec![]),
            ..Default::default()
        };
        assert!(repo.list(&filter, 20, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_officer() {
        let c = fixtures::case("c1", "io1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c.clone()]])
                .into_connection(),
        );
        let repo = CaseRepository::new(db);

        let filter = CaseFilter {
            officer_id: Some("io1".to_string()),
            ..Default::default()
        };
        let cases = repo.list(&filter, 20, 0).await.unwrap();
        assert_eq!(cases, vec![c]);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let repo = CaseRepository::new(db);
        assert!(!repo.delete("nope").await.unwrap());
    }
}
