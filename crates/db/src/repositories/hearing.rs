//! Hearing session repository.

use std::sync::Arc;

use super::db_err;
use crate::entities::{
    Case, HearingSession, attendance, case,
    hearing_session::{self, HearingStatus, SentFlag},
};
use bailiff_common::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait, sea_query::Expr,
};

/// Hearing session repository for database operations.
#[derive(Clone)]
pub struct HearingRepository {
    db: Arc<DatabaseConnection>,
}

impl HearingRepository {
    /// Create a new hearing repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a hearing by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<hearing_session::Model>> {
        HearingSession::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a hearing by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<hearing_session::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Hearing session {id}")))
    }

    /// Find the hearing a QR payload belongs to.
    pub async fn find_by_qr_code(&self, code: &str) -> AppResult<Option<hearing_session::Model>> {
        HearingSession::find()
            .filter(hearing_session::Column::QrCode.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the hearing a manual code belongs to.
    pub async fn find_by_manual_code(
        &self,
        code: &str,
    ) -> AppResult<Option<hearing_session::Model>> {
        HearingSession::find()
            .filter(hearing_session::Column::ManualCode.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether a manual code is already taken.
    pub async fn manual_code_exists(&self, code: &str) -> AppResult<bool> {
        let count = HearingSession::find()
            .filter(hearing_session::Column::ManualCode.eq(code))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Hearings of one case, latest first.
    pub async fn find_by_case(&self, case_id: &str) -> AppResult<Vec<hearing_session::Model>> {
        HearingSession::find()
            .filter(hearing_session::Column::CaseId.eq(case_id))
            .order_by_desc(hearing_session::Column::HearingDate)
            .order_by_desc(hearing_session::Column::HearingTime)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Scheduled or ongoing hearings of one case.
    pub async fn find_open_by_case(
        &self,
        case_id: &str,
    ) -> AppResult<Vec<hearing_session::Model>> {
        HearingSession::find()
            .filter(hearing_session::Column::CaseId.eq(case_id))
            .filter(hearing_session::Column::Status.is_in(HearingStatus::OPEN))
            .order_by_asc(hearing_session::Column::HearingDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Hearings on a given day, in time order.
    pub async fn find_by_date(&self, date: NaiveDate) -> AppResult<Vec<hearing_session::Model>> {
        HearingSession::find()
            .filter(hearing_session::Column::HearingDate.eq(date))
            .order_by_asc(hearing_session::Column::HearingTime)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Hearings on `date` in one of `statuses` whose `flag` is still unset.
    pub async fn find_due(
        &self,
        date: NaiveDate,
        statuses: &[HearingStatus],
        flag: SentFlag,
    ) -> AppResult<Vec<hearing_session::Model>> {
        HearingSession::find()
            .filter(hearing_session::Column::HearingDate.eq(date))
            .filter(hearing_session::Column::Status.is_in(statuses.iter().copied()))
            .filter(flag.column().eq(false))
            .order_by_asc(hearing_session::Column::HearingTime)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new hearing.
    pub async fn create(
        &self,
        model: hearing_session::ActiveModel,
    ) -> AppResult<hearing_session::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Insert a hearing together with its attendance rows and point the
    /// case's next-hearing fields at it. Nothing is written unless every
    /// statement succeeds.
    pub async fn schedule(
        &self,
        hearing: hearing_session::ActiveModel,
        attendees: Vec<attendance::ActiveModel>,
    ) -> AppResult<hearing_session::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let hearing = hearing.insert(&txn).await.map_err(db_err)?;
        for row in attendees {
            row.insert(&txn).await.map_err(db_err)?;
        }
        Case::update_many()
            .col_expr(case::Column::NextHearingDate, Expr::value(hearing.hearing_date))
            .col_expr(
                case::Column::NextHearingTime,
                Expr::value(hearing.hearing_time.clone()),
            )
            .col_expr(case::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(case::Column::Id.eq(hearing.case_id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(hearing)
    }

    /// Update a hearing.
    pub async fn update(
        &self,
        model: hearing_session::ActiveModel,
    ) -> AppResult<hearing_session::Model> {
        model.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Set a sent flag. Returns `false` if it was already set.
    pub async fn mark_flag(&self, id: &str, flag: SentFlag) -> AppResult<bool> {
        let result = HearingSession::update_many()
            .col_expr(flag.column(), Expr::value(true))
            .col_expr(hearing_session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(hearing_session::Column::Id.eq(id))
            .filter(flag.column().eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{entities::attendance::AttendanceStatus, test_utils::fixtures};
    use sea_orm::{DatabaseBackend, IntoActiveModel, MockDatabase, MockExecResult};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    fn schedule_rows() -> (hearing_session::ActiveModel, Vec<attendance::ActiveModel>) {
        let hearing = fixtures::hearing("h1", "c1", date(), "10:00")
            .into_active_model()
            .reset_all();
        let rows = ["io1", "w1"]
            .iter()
            .map(|user| {
                fixtures::attendance(&format!("a-{user}"), "h1", user, AttendanceStatus::NotMarked)
                    .into_active_model()
                    .reset_all()
            })
            .collect();
        (hearing, rows)
    }

    #[tokio::test]
    async fn test_schedule_commits_hearing_rows_and_case() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::hearing("h1", "c1", date(), "10:00")]])
                .append_query_results([[fixtures::attendance(
                    "a-io1",
                    "h1",
                    "io1",
                    AttendanceStatus::NotMarked,
                )]])
                .append_query_results([[fixtures::attendance(
                    "a-w1",
                    "h1",
                    "w1",
                    AttendanceStatus::NotMarked,
                )]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let repo = HearingRepository::new(db.clone());
        let (hearing, rows) = schedule_rows();

        let created = repo.schedule(hearing, rows).await.unwrap();
        assert_eq!(created.id, "h1");

        drop(repo);
        let log = format!("{:?}", Arc::try_unwrap(db).unwrap().into_transaction_log());
        assert!(log.contains("COMMIT"));
        assert!(!log.contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_schedule_rolls_back_when_an_attendance_insert_fails() {
        // Only the hearing insert has a result queued; the first attendance
        // insert errors.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::hearing("h1", "c1", date(), "10:00")]])
                .into_connection(),
        );
        let repo = HearingRepository::new(db.clone());
        let (hearing, rows) = schedule_rows();

        assert!(repo.schedule(hearing, rows).await.is_err());

        drop(repo);
        let log = format!("{:?}", Arc::try_unwrap(db).unwrap().into_transaction_log());
        assert!(log.contains("ROLLBACK"));
        assert!(!log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_mark_flag_only_once() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );
        let repo = HearingRepository::new(db);

        assert!(repo.mark_flag("h1", SentFlag::WeeklyReminder).await.unwrap());
        assert!(!repo.mark_flag("h1", SentFlag::WeeklyReminder).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_due() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let h = fixtures::hearing("h1", "c1", date, "10:00");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[h.clone()]])
                .into_connection(),
        );
        let repo = HearingRepository::new(db);

        let due = repo
            .find_due(date, &[HearingStatus::Scheduled], SentFlag::DayOfReminder)
            .await
            .unwrap();
        assert_eq!(due, vec![h]);
    }
}
