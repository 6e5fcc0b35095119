//! Attendance repository.

use std::sync::Arc;

use super::db_err;
use crate::entities::{
    Attendance,
    attendance::{self, AttendanceStatus, AttendeeRole, MarkMethod},
};
use bailiff_common::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Column values written when an attendee is marked.
#[derive(Debug, Clone)]
pub struct MarkUpdate {
    /// New status.
    pub status: AttendanceStatus,
    /// How the mark was captured.
    pub method: MarkMethod,
    /// Who captured it.
    pub marked_by: String,
    /// Arrival time, for present/late marks.
    pub arrival_time: Option<DateTime<Utc>>,
    /// Scan time, for QR marks.
    pub qr_scanned_at: Option<DateTime<Utc>>,
    /// QR marks are self-verifying.
    pub is_verified: bool,
    /// Free-text remarks.
    pub remarks: Option<String>,
}

/// Attendance repository for database operations.
#[derive(Clone)]
pub struct AttendanceRepository {
    db: Arc<DatabaseConnection>,
}

impl AttendanceRepository {
    /// Create a new attendance repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an attendance record by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<attendance::Model>> {
        Attendance::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an attendance record by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<attendance::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attendance record {id}")))
    }

    /// The record of one user at one hearing.
    pub async fn find_by_session_and_user(
        &self,
        hearing_session_id: &str,
        user_id: &str,
    ) -> AppResult<Option<attendance::Model>> {
        Attendance::find()
            .filter(attendance::Column::HearingSessionId.eq(hearing_session_id))
            .filter(attendance::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All records of one hearing.
    pub async fn find_by_session(
        &self,
        hearing_session_id: &str,
    ) -> AppResult<Vec<attendance::Model>> {
        Attendance::find()
            .filter(attendance::Column::HearingSessionId.eq(hearing_session_id))
            .order_by_asc(attendance::Column::AttendeeRole)
            .order_by_asc(attendance::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A user's attendance history, latest hearing first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<attendance::Model>> {
        Attendance::find()
            .filter(attendance::Column::UserId.eq(user_id))
            .order_by_desc(attendance::Column::HearingDate)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create one attendance record.
    pub async fn create(&self, model: attendance::ActiveModel) -> AppResult<attendance::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Move a record from `from` to the marked state in a single statement.
    ///
    /// Returns `false` when the row was no longer in `from`, i.e. someone
    /// else marked it first.
    pub async fn mark_if_status(
        &self,
        id: &str,
        from: AttendanceStatus,
        update: &MarkUpdate,
    ) -> AppResult<bool> {
        let result = Attendance::update_many()
            .col_expr(
                attendance::Column::Status,
                Expr::value(update.status.as_str()),
            )
            .col_expr(
                attendance::Column::MarkedMethod,
                Expr::value(update.method),
            )
            .col_expr(
                attendance::Column::MarkedBy,
                Expr::value(update.marked_by.clone()),
            )
            .col_expr(
                attendance::Column::ArrivalTime,
                Expr::value(update.arrival_time),
            )
            .col_expr(
                attendance::Column::QrScannedAt,
                Expr::value(update.qr_scanned_at),
            )
            .col_expr(
                attendance::Column::IsVerified,
                Expr::value(update.is_verified),
            )
            .col_expr(attendance::Column::Remarks, Expr::value(update.remarks.clone()))
            .col_expr(attendance::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(attendance::Column::Id.eq(id))
            .filter(attendance::Column::Status.eq(from))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Move a record between statuses without touching capture details.
    pub async fn transition(
        &self,
        id: &str,
        from: AttendanceStatus,
        to: AttendanceStatus,
    ) -> AppResult<bool> {
        let result = Attendance::update_many()
            .col_expr(attendance::Column::Status, Expr::value(to.as_str()))
            .col_expr(attendance::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(attendance::Column::Id.eq(id))
            .filter(attendance::Column::Status.eq(from))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Hand a hearing's still-unmarked officer row to another officer.
    ///
    /// Returns `false` when there was no unmarked officer row for `from`;
    /// a row that has already been marked stays with whoever attended.
    pub async fn reassign_unmarked_officer(
        &self,
        hearing_session_id: &str,
        from: &str,
        to: &str,
    ) -> AppResult<bool> {
        let result = Attendance::update_many()
            .col_expr(attendance::Column::UserId, Expr::value(to))
            .col_expr(attendance::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(attendance::Column::HearingSessionId.eq(hearing_session_id))
            .filter(attendance::Column::UserId.eq(from))
            .filter(attendance::Column::AttendeeRole.eq(AttendeeRole::Officer))
            .filter(attendance::Column::Status.eq(AttendanceStatus::NotMarked))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    /// Mark every still-unmarked record of a hearing absent.
    pub async fn finalize_unmarked(&self, hearing_session_id: &str) -> AppResult<u64> {
        let result = Attendance::update_many()
            .col_expr(
                attendance::Column::Status,
                Expr::value(AttendanceStatus::Absent.as_str()),
            )
            .col_expr(attendance::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(attendance::Column::HearingSessionId.eq(hearing_session_id))
            .filter(attendance::Column::Status.eq(AttendanceStatus::NotMarked))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Flag a manually captured mark as verified.
    pub async fn verify(&self, id: &str, verifier_id: &str) -> AppResult<attendance::Model> {
        let record = self.get_by_id(id).await?;
        let mut active: attendance::ActiveModel = record.into();
        active.is_verified = sea_orm::Set(true);
        active.verified_by = sea_orm::Set(Some(verifier_id.to_string()));
        active.updated_at = sea_orm::Set(Some(Utc::now().into()));
        active.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Absences recorded for a user on hearings dated `since` or later.
    pub async fn count_absences_since(&self, user_id: &str, since: NaiveDate) -> AppResult<u64> {
        Attendance::find()
            .filter(attendance::Column::UserId.eq(user_id))
            .filter(attendance::Column::Status.eq(AttendanceStatus::Absent))
            .filter(attendance::Column::HearingDate.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn manual_mark() -> MarkUpdate {
        MarkUpdate {
            status: AttendanceStatus::Present,
            method: MarkMethod::Manual,
            marked_by: "u1".to_string(),
            arrival_time: Some(Utc::now()),
            qr_scanned_at: None,
            is_verified: false,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn test_conditional_mark_loses_race() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );
        let repo = AttendanceRepository::new(db);

        let first = repo
            .mark_if_status("a1", AttendanceStatus::NotMarked, &manual_mark())
            .await
            .unwrap();
        let second = repo
            .mark_if_status("a1", AttendanceStatus::NotMarked, &manual_mark())
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_reassign_touches_only_unmarked_officer_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );
        let repo = AttendanceRepository::new(db.clone());

        assert!(repo.reassign_unmarked_officer("h1", "io1", "io2").await.unwrap());
        assert!(!repo.reassign_unmarked_officer("h2", "io1", "io2").await.unwrap());

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = &log[0].statements()[0].sql;
        assert!(sql.starts_with(r#"UPDATE "attendance""#));
        assert!(sql.contains(r#""attendee_role" = "#));
        assert!(sql.contains(r#""status" = "#));
    }

    #[tokio::test]
    async fn test_finalize_unmarked_counts_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(2)])
                .into_connection(),
        );
        let repo = AttendanceRepository::new(db);
        assert_eq!(repo.finalize_unmarked("h1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_count_absences_since() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3)),
                }]])
                .into_connection(),
        );
        let repo = AttendanceRepository::new(db);

        let since = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(repo.count_absences_since("io1", since).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_verify_sets_verifier() {
        let record = fixtures::attendance("a1", "h1", "w1", AttendanceStatus::Present);
        let mut verified = record.clone();
        verified.is_verified = true;
        verified.verified_by = Some("lo1".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record], [verified]])
                .into_connection(),
        );
        let repo = AttendanceRepository::new(db);

        let result = repo.verify("a1", "lo1").await.unwrap();
        assert!(result.is_verified);
        assert_eq!(result.verified_by.as_deref(), Some("lo1"));
    }
}
