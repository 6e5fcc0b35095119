//! Hearing service.

use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::{
    attendance::unmarked_row,
    hearing_notification::HearingNotificationService,
    qr::{QR_VERSION, QrCodec, QrPayload},
};
use bailiff_common::{AppError, AppResult, IdGenerator, SharedClock};
use bailiff_db::{
    entities::{
        attendance::AttendeeRole,
        case::CaseStatus,
        hearing_session::{self, HearingStatus, SentFlag},
        user,
    },
    repositories::{CaseRepository, HearingRepository, WitnessRepository},
};

/// Attempts at drawing an unused manual code.
const MANUAL_CODE_ATTEMPTS: usize = 5;

/// Input for scheduling a hearing.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHearingInput {
    pub case_id: String,

    pub hearing_date: NaiveDate,

    /// "HH:MM", court local time.
    #[validate(length(equal = 5))]
    pub hearing_time: String,

    #[validate(length(max = 32))]
    pub court_room: Option<String>,

    #[validate(length(max = 128))]
    pub judge_name: Option<String>,

    #[validate(length(max = 2048))]
    pub notes: Option<String>,
}

/// What a court-room display needs to show.
#[derive(Debug, Clone, Serialize)]
pub struct QrContent {
    pub hearing_id: String,
    pub qr_code: String,
    pub manual_code: String,
    pub hearing_date: NaiveDate,
    pub hearing_time: String,
}

/// Hearing service for business logic.
#[derive(Clone)]
pub struct HearingService {
    hearing_repo: HearingRepository,
    case_repo: CaseRepository,
    witness_repo: WitnessRepository,
    notifier: HearingNotificationService,
    qr: QrCodec,
    clock: SharedClock,
    court_tz: Tz,
    id_gen: IdGenerator,
}

impl HearingService {
    /// Create a new hearing service.
    #[must_use]
    pub fn new(
        hearing_repo: HearingRepository,
        case_repo: CaseRepository,
        witness_repo: WitnessRepository,
        notifier: HearingNotificationService,
        qr: QrCodec,
        clock: SharedClock,
        court_tz: Tz,
    ) -> Self {
        Self {
            hearing_repo,
            case_repo,
            witness_repo,
            notifier,
            qr,
            clock,
            court_tz,
            id_gen: IdGenerator::new(),
        }
    }

    /// Schedule a hearing: codes, one attendance row per attendee, the
    /// case's next-hearing fields, and the "hearing scheduled" notice.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreateHearingInput,
    ) -> AppResult<hearing_session::Model> {
        input.validate()?;
        if NaiveTime::parse_from_str(&input.hearing_time, "%H:%M").is_err() {
            return Err(AppError::Validation(
                "hearing_time must be HH:MM".to_string(),
            ));
        }
        if input.hearing_date < self.clock.today_in(self.court_tz) {
            return Err(AppError::Validation(
                "Hearing date is in the past".to_string(),
            ));
        }

        let case = self.case_repo.get_by_id(&input.case_id).await?;
        if case.status == CaseStatus::Disposed {
            return Err(AppError::Validation(
                "Case has been disposed".to_string(),
            ));
        }

        let id = self.id_gen.generate();
        let manual_code = self.unused_manual_code().await?;
        let qr_code = self.qr.encode(&QrPayload {
            v: QR_VERSION,
            case_id: case.id.clone(),
            hearing_id: id.clone(),
            hearing_date: input.hearing_date,
            manual_code: manual_code.clone(),
            issued_at: self.clock.now(),
            nonce: self.id_gen.generate_token(),
        })?;

        let mut attendees = vec![(case.investigating_officer_id.clone(), AttendeeRole::Officer)];
        attendees.extend(
            self.witness_repo
                .find_by_case(&case.id)
                .await?
                .into_iter()
                .map(|w| (w.user_id, AttendeeRole::Witness)),
        );
        let rows: Vec<_> = attendees
            .into_iter()
            .map(|(user_id, role)| {
                unmarked_row(
                    self.id_gen.generate(),
                    &id,
                    &case.id,
                    input.hearing_date,
                    user_id,
                    role,
                )
            })
            .collect();

        let model = hearing_session::ActiveModel {
            id: Set(id),
            case_id: Set(case.id.clone()),
            hearing_date: Set(input.hearing_date),
            hearing_time: Set(input.hearing_time),
            court_room: Set(input.court_room),
            judge_name: Set(input.judge_name),
            qr_code: Set(qr_code),
            manual_code: Set(manual_code),
            status: Set(HearingStatus::Scheduled),
            weekly_reminder_sent: Set(false),
            day_of_reminder_sent: Set(false),
            post_notifications_sent: Set(false),
            notification_sent: Set(false),
            notes: Set(input.notes),
            created_by: Set(actor.id.clone()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let mut hearing = self.hearing_repo.schedule(model, rows).await?;

        tracing::info!(
            hearing_id = %hearing.id,
            case_id = %case.id,
            date = %hearing.hearing_date,
            "Hearing scheduled"
        );

        match self.announce(&hearing).await {
            Ok(_) => hearing.notification_sent = true,
            Err(e) => {
                tracing::warn!(error = %e, hearing_id = %hearing.id, "Hearing announcement failed");
            }
        }

        Ok(hearing)
    }

    /// Fetch a hearing.
    pub async fn get(&self, id: &str) -> AppResult<hearing_session::Model> {
        self.hearing_repo.get_by_id(id).await
    }

    /// Hearings of one case.
    pub async fn list_for_case(&self, case_id: &str) -> AppResult<Vec<hearing_session::Model>> {
        self.case_repo.get_by_id(case_id).await?;
        self.hearing_repo.find_by_case(case_id).await
    }

    /// Today's hearings in the court timezone.
    pub async fn list_today(&self) -> AppResult<Vec<hearing_session::Model>> {
        self.hearing_repo
            .find_by_date(self.clock.today_in(self.court_tz))
            .await
    }

    /// Move a hearing along its lifecycle.
    pub async fn update_status(
        &self,
        id: &str,
        status: HearingStatus,
    ) -> AppResult<hearing_session::Model> {
        let hearing = self.hearing_repo.get_by_id(id).await?;
        if hearing.status == status {
            return Ok(hearing);
        }
        if !hearing.status.can_transition_to(status) {
            return Err(AppError::Validation(format!(
                "Hearing cannot move from {} to {}",
                hearing.status, status
            )));
        }

        let mut active = hearing.into_active_model();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().into()));
        let hearing = self.hearing_repo.update(active).await?;

        tracing::info!(hearing_id = %hearing.id, status = ?hearing.status, "Hearing status changed");
        Ok(hearing)
    }

    /// QR and manual code of a hearing.
    pub async fn qr_content(&self, id: &str) -> AppResult<QrContent> {
        let hearing = self.hearing_repo.get_by_id(id).await?;
        Ok(QrContent {
            hearing_id: hearing.id,
            qr_code: hearing.qr_code,
            manual_code: hearing.manual_code,
            hearing_date: hearing.hearing_date,
            hearing_time: hearing.hearing_time,
        })
    }

    /// Send the "hearing scheduled" notice if it has not gone out yet.
    /// Returns `false` when it had already been sent.
    pub async fn send_scheduled_notification(&self, id: &str) -> AppResult<bool> {
        let hearing = self.hearing_repo.get_by_id(id).await?;
        if hearing.notification_sent {
            return Ok(false);
        }
        self.announce(&hearing).await
    }

    async fn announce(&self, hearing: &hearing_session::Model) -> AppResult<bool> {
        self.notifier.send_hearing_scheduled(hearing).await?;
        self.hearing_repo
            .mark_flag(&hearing.id, SentFlag::Notification)
            .await
    }

    async fn unused_manual_code(&self) -> AppResult<String> {
        for _ in 0..MANUAL_CODE_ATTEMPTS {
            let code = self.id_gen.generate_manual_code();
            if !self.hearing_repo.manual_code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(AppError::Conflict(
            "Could not allocate a unique attendance code".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::dispatcher::NotificationDispatcher;
    use bailiff_common::{FixedClock, config::QrConfig};
    use bailiff_db::{
        repositories::{
            AttendanceRepository, NotificationRepository, SettingsRepository, UserRepository,
        },
        test_utils::fixtures,
    };
    use chrono::TimeZone;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn service(db: DatabaseConnection) -> HearingService {
        let db = Arc::new(db);
        let clock: SharedClock =
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).unwrap()));
        let tz = chrono_tz::Asia::Kolkata;
        let notifier = HearingNotificationService::new(
            CaseRepository::new(db.clone()),
            WitnessRepository::new(db.clone()),
            AttendanceRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            NotificationDispatcher::new(
                NotificationRepository::new(db.clone()),
                SettingsRepository::new(db.clone()),
                None,
                None,
                "https://attendance.example.org",
            ),
            clock.clone(),
            tz,
        );
        HearingService::new(
            HearingRepository::new(db.clone()),
            CaseRepository::new(db.clone()),
            WitnessRepository::new(db),
            notifier,
            QrCodec::new(&QrConfig::default()),
            clock,
            tz,
        )
    }

    fn create_input(date: NaiveDate, time: &str) -> CreateHearingInput {
        CreateHearingInput {
            case_id: "c1".to_string(),
            hearing_date: date,
            hearing_time: time.to_string(),
            court_room: Some("4".to_string()),
            judge_name: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_bad_time() {
        let admin = fixtures::user("a1", bailiff_db::entities::user::UserRole::Admin);
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let err = service
            .create(&admin, create_input(today(), "9am!!"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_past_date() {
        let admin = fixtures::user("a1", bailiff_db::entities::user::UserRole::Admin);
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let err = service
            .create(&admin, create_input(today().pred_opt().unwrap(), "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_manual_code_gives_up_after_collisions() {
        let taken = btreemap! { "num_items" => sea_orm::Value::BigInt(Some(1)) };
        let mut db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::case("c1", "io1")]]);
        for _ in 0..MANUAL_CODE_ATTEMPTS {
            db = db.append_query_results([[taken.clone()]]);
        }
        let admin = fixtures::user("a1", bailiff_db::entities::user::UserRole::Admin);

        let err = service(db.into_connection())
            .create(&admin, create_input(today(), "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_completed_hearing_cannot_restart() {
        let mut hearing = fixtures::hearing("h1", "c1", today(), "10:00");
        hearing.status = HearingStatus::Completed;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[hearing]])
            .into_connection();

        let err = service(db)
            .update_status("h1", HearingStatus::Ongoing)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_scheduled_notice_not_resent() {
        let mut hearing = fixtures::hearing("h1", "c1", today(), "10:00");
        hearing.notification_sent = true;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[hearing]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        assert!(!service(db).send_scheduled_notification("h1").await.unwrap());
    }
}
