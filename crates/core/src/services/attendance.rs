//! Attendance service.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::qr::QrCodec;
use bailiff_common::{AppError, AppResult, SharedClock};
use bailiff_db::{
    entities::{
        attendance::{self, AttendanceStatus, AttendeeRole, MarkMethod},
        hearing_session::{self, HearingStatus},
    },
    repositories::{AttendanceRepository, CaseRepository, HearingRepository, MarkUpdate},
};

/// Which kind of code the attendee presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    /// JSON content of the hearing QR code.
    Qr,
    /// Short human-typed code.
    Manual,
}

/// Input for marking your own attendance.
#[derive(Debug, Deserialize, Validate)]
pub struct MarkAttendanceInput {
    #[validate(length(min = 1, max = 4096))]
    pub code: String,

    #[serde(default)]
    pub code_type: Option<CodeType>,
}

/// Input for staff marking someone else's attendance.
#[derive(Debug, Deserialize, Validate)]
pub struct MarkStatusInput {
    pub status: AttendanceStatus,

    #[validate(length(max = 1024))]
    pub remarks: Option<String>,
}

/// Result of a mark call.
#[derive(Debug, Clone, Serialize)]
pub struct MarkOutcome {
    /// The record as stored after the call.
    pub attendance: attendance::Model,
    /// `true` when the record had already left `not_marked`; nothing was written.
    pub already_marked: bool,
}

impl MarkOutcome {
    /// User-facing message for the outcome.
    #[must_use]
    pub fn message(&self) -> String {
        if self.already_marked {
            format!("Attendance already marked as {}", self.attendance.status)
        } else {
            format!("Attendance marked as {}", self.attendance.status)
        }
    }
}

/// A fresh `not_marked` row for one attendee of a hearing.
pub(crate) fn unmarked_row(
    id: String,
    hearing_id: &str,
    case_id: &str,
    hearing_date: NaiveDate,
    user_id: String,
    attendee_role: AttendeeRole,
) -> attendance::ActiveModel {
    attendance::ActiveModel {
        id: Set(id),
        hearing_session_id: Set(hearing_id.to_string()),
        case_id: Set(case_id.to_string()),
        user_id: Set(user_id),
        attendee_role: Set(attendee_role),
        hearing_date: Set(hearing_date),
        status: Set(AttendanceStatus::NotMarked),
        marked_method: Set(None),
        marked_by: Set(None),
        arrival_time: Set(None),
        qr_scanned_at: Set(None),
        is_verified: Set(false),
        verified_by: Set(None),
        remarks: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

/// Attendance service for business logic.
#[derive(Clone)]
pub struct AttendanceService {
    hearing_repo: HearingRepository,
    attendance_repo: AttendanceRepository,
    case_repo: CaseRepository,
    qr: QrCodec,
    clock: SharedClock,
    court_tz: Tz,
}

impl AttendanceService {
    /// Create a new attendance service.
    #[must_use]
    pub fn new(
        hearing_repo: HearingRepository,
        attendance_repo: AttendanceRepository,
        case_repo: CaseRepository,
        qr: QrCodec,
        clock: SharedClock,
        court_tz: Tz,
    ) -> Self {
        Self {
            hearing_repo,
            attendance_repo,
            case_repo,
            qr,
            clock,
            court_tz,
        }
    }

    /// Mark `user_id` present at the hearing identified by a QR or manual code.
    ///
    /// Marking is idempotent: a record that is no longer `not_marked` is
    /// returned unchanged with `already_marked` set.
    pub async fn mark(
        &self,
        user_id: &str,
        input: MarkAttendanceInput,
    ) -> AppResult<MarkOutcome> {
        input.validate()?;
        let code = input.code.trim();

        let (hearing, method) = match input.code_type {
            Some(CodeType::Qr) => (self.resolve_qr(code).await?, MarkMethod::QrScan),
            Some(CodeType::Manual) => (self.resolve_manual(code).await?, MarkMethod::Manual),
            None => {
                if looks_like_qr(code) {
                    (self.resolve_qr(code).await?, MarkMethod::QrScan)
                } else {
                    (self.resolve_manual(code).await?, MarkMethod::Manual)
                }
            }
        };

        if hearing.status == HearingStatus::Cancelled {
            return Err(AppError::Validation(
                "This hearing has been cancelled".to_string(),
            ));
        }

        let record = self
            .attendance_repo
            .find_by_session_and_user(&hearing.id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("You are not listed for this hearing".to_string())
            })?;

        if record.status != AttendanceStatus::NotMarked {
            return Ok(MarkOutcome {
                attendance: record,
                already_marked: true,
            });
        }

        let now = self.clock.now();
        let scanned = method == MarkMethod::QrScan;
        let update = MarkUpdate {
            status: AttendanceStatus::Present,
            method,
            marked_by: user_id.to_string(),
            arrival_time: Some(now),
            qr_scanned_at: scanned.then_some(now),
            is_verified: scanned,
            remarks: None,
        };

        self.apply(record, update).await
    }

    /// Staff marking of an attendance record.
    pub async fn mark_status(
        &self,
        attendance_id: &str,
        marked_by: &str,
        input: MarkStatusInput,
    ) -> AppResult<MarkOutcome> {
        input.validate()?;
        if input.status == AttendanceStatus::NotMarked {
            return Err(AppError::Validation(
                "Attendance cannot be reset to not_marked".to_string(),
            ));
        }

        let record = self.attendance_repo.get_by_id(attendance_id).await?;
        if record.status != AttendanceStatus::NotMarked {
            return Ok(MarkOutcome {
                attendance: record,
                already_marked: true,
            });
        }

        let now = self.clock.now();
        let update = MarkUpdate {
            status: input.status,
            method: MarkMethod::Manual,
            marked_by: marked_by.to_string(),
            arrival_time: input.status.counts_as_present().then_some(now),
            qr_scanned_at: None,
            is_verified: true,
            remarks: input.remarks,
        };

        self.apply(record, update).await
    }

    /// Verify a manually captured mark.
    pub async fn verify(&self, attendance_id: &str, verifier_id: &str) -> AppResult<attendance::Model> {
        let record = self.attendance_repo.get_by_id(attendance_id).await?;

        if record.status == AttendanceStatus::NotMarked {
            return Err(AppError::Validation(
                "Attendance has not been marked yet".to_string(),
            ));
        }
        if record.is_verified {
            return Ok(record);
        }

        self.attendance_repo.verify(attendance_id, verifier_id).await
    }

    /// Every record for one hearing.
    pub async fn list_for_hearing(&self, hearing_id: &str) -> AppResult<Vec<attendance::Model>> {
        self.hearing_repo.get_by_id(hearing_id).await?;
        self.attendance_repo.find_by_session(hearing_id).await
    }

    /// A user's own attendance history.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<attendance::Model>> {
        self.attendance_repo
            .find_by_user(user_id, limit.min(100), offset)
            .await
    }

    async fn apply(
        &self,
        record: attendance::Model,
        update: MarkUpdate,
    ) -> AppResult<MarkOutcome> {
        let flipped = self
            .attendance_repo
            .mark_if_status(&record.id, AttendanceStatus::NotMarked, &update)
            .await?;
        let attendance = self.attendance_repo.get_by_id(&record.id).await?;

        if !flipped {
            tracing::debug!(attendance_id = %record.id, "Lost marking race; returning stored status");
            return Ok(MarkOutcome {
                attendance,
                already_marked: true,
            });
        }

        self.case_repo
            .set_attendance_status(&attendance.case_id, attendance.status)
            .await?;

        tracing::info!(
            attendance_id = %attendance.id,
            hearing_id = %attendance.hearing_session_id,
            user_id = %attendance.user_id,
            status = %attendance.status,
            "Attendance marked"
        );

        Ok(MarkOutcome {
            attendance,
            already_marked: false,
        })
    }

    async fn resolve_qr(&self, code: &str) -> AppResult<hearing_session::Model> {
        let now = self.clock.now();
        let payload = self.qr.decode(code, now)?;

        let hearing = self
            .hearing_repo
            .find_by_qr_code(code)
            .await?
            .filter(|h| h.id == payload.hearing_id)
            .ok_or_else(|| AppError::NotFound("No hearing matches this QR code".to_string()))?;

        if hearing.hearing_date != self.clock.today_in(self.court_tz) {
            return Err(AppError::BadRequest(
                "This QR code is not valid today".to_string(),
            ));
        }

        Ok(hearing)
    }

    async fn resolve_manual(&self, code: &str) -> AppResult<hearing_session::Model> {
        let normalized = code.to_uppercase();
        self.hearing_repo
            .find_by_manual_code(&normalized)
            .await?
            .ok_or_else(|| AppError::NotFound("No hearing matches this code".to_string()))
    }
}

/// QR content is a JSON object; manual codes are short alphanumerics.
fn looks_like_qr(code: &str) -> bool {
    code.starts_with('{')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::qr::{QR_VERSION, QrPayload};
    use bailiff_common::{FixedClock, clock::Clock, config::QrConfig};
    use bailiff_db::test_utils::fixtures;
    use chrono::{NaiveDate, TimeZone, Utc};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    const TZ: Tz = chrono_tz::Asia::Kolkata;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn clock() -> FixedClock {
        // 10:15 in Kolkata.
        FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 4, 45, 0).unwrap())
    }

    fn service(db: DatabaseConnection) -> AttendanceService {
        let db = Arc::new(db);
        AttendanceService::new(
            HearingRepository::new(db.clone()),
            AttendanceRepository::new(db.clone()),
            CaseRepository::new(db),
            QrCodec::new(&QrConfig::default()),
            Arc::new(clock()),
            TZ,
        )
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn manual_input(code: &str) -> MarkAttendanceInput {
        MarkAttendanceInput {
            code: code.to_string(),
            code_type: None,
        }
    }

    #[test]
    fn test_outcome_message() {
        let outcome = MarkOutcome {
            attendance: fixtures::attendance("a1", "h1", "w1", AttendanceStatus::Present),
            already_marked: true,
        };
        assert_eq!(outcome.message(), "Attendance already marked as present");
    }

    #[tokio::test]
    async fn test_manual_mark_twice_is_idempotent() {
        let hearing = fixtures::hearing("h1", "c1", today(), "10:00");
        let mut marked = fixtures::attendance("a1", "h1", "w1", AttendanceStatus::Present);
        marked.marked_method = Some(MarkMethod::Manual);
        marked.arrival_time = Some(clock().now().into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // first call
            .append_query_results([[hearing.clone()]])
            .append_query_results([[fixtures::attendance(
                "a1",
                "h1",
                "w1",
                AttendanceStatus::NotMarked,
            )]])
            .append_query_results([[marked.clone()]])
            // second call
            .append_query_results([[hearing]])
            .append_query_results([[marked.clone()]])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let service = service(db);

        let first = service.mark("w1", manual_input(" mh1 ")).await.unwrap();
        assert!(!first.already_marked);
        assert_eq!(first.attendance.status, AttendanceStatus::Present);

        let second = service.mark("w1", manual_input("MH1")).await.unwrap();
        assert!(second.already_marked);
        assert_eq!(second.message(), "Attendance already marked as present");
        assert_eq!(second.attendance.arrival_time, marked.arrival_time);
    }

    #[tokio::test]
    async fn test_lost_race_reports_already_marked() {
        let hearing = fixtures::hearing("h1", "c1", today(), "10:00");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[hearing]])
            .append_query_results([[fixtures::attendance(
                "a1",
                "h1",
                "w1",
                AttendanceStatus::NotMarked,
            )]])
            .append_query_results([[fixtures::attendance(
                "a1",
                "h1",
                "w1",
                AttendanceStatus::Present,
            )]])
            .append_exec_results([exec(0)])
            .into_connection();

        let outcome = service(db).mark("w1", manual_input("MH1")).await.unwrap();
        assert!(outcome.already_marked);
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<hearing_session::Model>::new()])
            .into_connection();

        let err = service(db).mark("w1", manual_input("NOPE")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_not_listed_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::hearing("h1", "c1", today(), "10:00")]])
            .append_query_results([Vec::<attendance::Model>::new()])
            .into_connection();

        let err = service(db).mark("w9", manual_input("MH1")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancelled_hearing_is_rejected() {
        let mut hearing = fixtures::hearing("h1", "c1", today(), "10:00");
        hearing.status = HearingStatus::Cancelled;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[hearing]])
            .into_connection();

        let err = service(db).mark("w1", manual_input("MH1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_qr_for_another_day_is_stale() {
        let codec = QrCodec::new(&QrConfig::default());
        let tomorrow = today().succ_opt().unwrap();
        let raw = codec
            .encode(&QrPayload {
                v: QR_VERSION,
                case_id: "c1".to_string(),
                hearing_id: "h1".to_string(),
                hearing_date: tomorrow,
                manual_code: "MH1".to_string(),
                issued_at: clock().now(),
                nonce: "n".to_string(),
            })
            .unwrap();
        let mut hearing = fixtures::hearing("h1", "c1", tomorrow, "10:00");
        hearing.qr_code = raw.clone();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[hearing]])
            .into_connection();

        let err = service(db).mark("w1", manual_input(&raw)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_staff_cannot_reset_to_not_marked() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = service(db)
            .mark_status(
                "a1",
                "lo1",
                MarkStatusInput {
                    status: AttendanceStatus::NotMarked,
                    remarks: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
