//! Case service.

use chrono::Utc;
use sea_orm::{IntoActiveModel, Set};
use serde::Deserialize;
use validator::Validate;

use crate::services::attendance::unmarked_row;
use bailiff_common::{AppError, AppResult, IdGenerator};
use bailiff_db::{
    entities::{
        attendance::AttendeeRole,
        case::{self, CaseStatus},
        user::{self, UserRole},
        witness,
    },
    repositories::{
        AttendanceRepository, CaseFilter, CaseRepository, HearingRepository, UserRepository,
        WitnessRepository,
    },
};

/// Input for opening a case.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCaseInput {
    #[validate(length(min = 1, max = 64))]
    pub fir_number: String,

    #[validate(length(min = 1, max = 256))]
    pub title: String,

    #[validate(length(max = 4096))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 128))]
    pub police_station: String,

    #[validate(length(min = 1, max = 256))]
    pub court_name: String,

    #[validate(length(max = 256))]
    pub sections: Option<String>,

    pub investigating_officer_id: String,

    pub liaison_officer_id: Option<String>,
}

/// Input for editing a case. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCaseInput {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,

    #[validate(length(max = 4096))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 256))]
    pub court_name: Option<String>,

    #[validate(length(max = 256))]
    pub sections: Option<String>,

    pub investigating_officer_id: Option<String>,

    pub liaison_officer_id: Option<String>,
}

/// Input for attaching a witness.
#[derive(Debug, Deserialize, Validate)]
pub struct AddWitnessInput {
    pub user_id: String,

    #[validate(length(max = 512))]
    pub address: Option<String>,

    #[serde(default)]
    pub statement_recorded: bool,
}

/// Case service for business logic.
#[derive(Clone)]
pub struct CaseService {
    case_repo: CaseRepository,
    witness_repo: WitnessRepository,
    user_repo: UserRepository,
    hearing_repo: HearingRepository,
    attendance_repo: AttendanceRepository,
    id_gen: IdGenerator,
}

impl CaseService {
    /// Create a new case service.
    #[must_use]
    pub const fn new(
        case_repo: CaseRepository,
        witness_repo: WitnessRepository,
        user_repo: UserRepository,
        hearing_repo: HearingRepository,
        attendance_repo: AttendanceRepository,
    ) -> Self {
        Self {
            case_repo,
            witness_repo,
            user_repo,
            hearing_repo,
            attendance_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Open a case.
    pub async fn create(&self, actor: &user::Model, input: CreateCaseInput) -> AppResult<case::Model> {
        input.validate()?;
        self.require_role(&input.investigating_officer_id, UserRole::InvestigatingOfficer)
            .await?;
        if let Some(liaison) = &input.liaison_officer_id {
            self.require_role(liaison, UserRole::LiaisonOfficer).await?;
        }

        let model = case::ActiveModel {
            id: Set(self.id_gen.generate()),
            fir_number: Set(input.fir_number.trim().to_string()),
            title: Set(input.title),
            description: Set(input.description),
            police_station: Set(input.police_station),
            court_name: Set(input.court_name),
            sections: Set(input.sections),
            investigating_officer_id: Set(input.investigating_officer_id),
            liaison_officer_id: Set(input.liaison_officer_id),
            status: Set(CaseStatus::Pending),
            attendance_status: Set(None),
            next_hearing_date: Set(None),
            next_hearing_time: Set(None),
            created_by: Set(actor.id.clone()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let case = self.case_repo.create(model).await?;
        tracing::info!(case_id = %case.id, fir = %case.fir_number, "Case created");
        Ok(case)
    }

    /// Fetch a case the actor may see.
    pub async fn get(&self, actor: &user::Model, id: &str) -> AppResult<case::Model> {
        let case = self.case_repo.get_by_id(id).await?;
        self.ensure_can_view(actor, &case).await?;
        Ok(case)
    }

    /// Cases visible to the actor: staff see everything, officers their
    /// assigned cases, witnesses the cases they are attached to.
    pub async fn list(
        &self,
        actor: &user::Model,
        status: Option<CaseStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<case::Model>> {
        let mut filter = CaseFilter {
            status,
            ..CaseFilter::default()
        };

        match actor.role {
            UserRole::Admin | UserRole::LiaisonOfficer => {}
            UserRole::InvestigatingOfficer => filter.officer_id = Some(actor.id.clone()),
            UserRole::Witness => {
                filter.case_ids = Some(self.witness_repo.find_case_ids_for_user(&actor.id).await?);
            }
        }

        self.case_repo.list(&filter, limit.min(100), offset).await
    }

    /// Edit a case. A new investigating officer takes over the unmarked
    /// officer rows of the case's open hearings.
    pub async fn update(&self, id: &str, input: UpdateCaseInput) -> AppResult<case::Model> {
        input.validate()?;
        let case = self.case_repo.get_by_id(id).await?;
        let previous_officer = case.investigating_officer_id.clone();

        if let Some(officer) = &input.investigating_officer_id {
            self.require_role(officer, UserRole::InvestigatingOfficer).await?;
        }
        if let Some(liaison) = &input.liaison_officer_id {
            self.require_role(liaison, UserRole::LiaisonOfficer).await?;
        }

        let mut active = case.into_active_model();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(court_name) = input.court_name {
            active.court_name = Set(court_name);
        }
        if let Some(sections) = input.sections {
            active.sections = Set(Some(sections));
        }
        if let Some(officer) = input.investigating_officer_id {
            active.investigating_officer_id = Set(officer);
        }
        if let Some(liaison) = input.liaison_officer_id {
            active.liaison_officer_id = Set(Some(liaison));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let case = self.case_repo.update(active).await?;
        if case.investigating_officer_id != previous_officer {
            self.hand_over_officer_rows(&case, &previous_officer).await?;
        }
        Ok(case)
    }

    async fn hand_over_officer_rows(&self, case: &case::Model, previous: &str) -> AppResult<()> {
        let officer = &case.investigating_officer_id;
        for hearing in self.hearing_repo.find_open_by_case(&case.id).await? {
            if self
                .attendance_repo
                .find_by_session_and_user(&hearing.id, officer)
                .await?
                .is_some()
            {
                continue;
            }
            if self
                .attendance_repo
                .reassign_unmarked_officer(&hearing.id, previous, officer)
                .await?
            {
                continue;
            }
            // The previous officer already has a mark on this hearing.
            self.attendance_repo
                .create(unmarked_row(
                    self.id_gen.generate(),
                    &hearing.id,
                    &case.id,
                    hearing.hearing_date,
                    officer.clone(),
                    AttendeeRole::Officer,
                ))
                .await?;
        }

        tracing::info!(case_id = %case.id, from = %previous, to = %officer, "Investigating officer reassigned");
        Ok(())
    }

    /// Move a case along its lifecycle.
    pub async fn change_status(&self, id: &str, status: CaseStatus) -> AppResult<case::Model> {
        let case = self.case_repo.get_by_id(id).await?;
        if case.status == status {
            return Ok(case);
        }
        if !case.status.can_transition_to(status) {
            return Err(AppError::Validation(format!(
                "Case cannot move from {} to {}",
                case.status, status
            )));
        }

        let mut active = case.into_active_model();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().into()));
        let case = self.case_repo.update(active).await?;

        tracing::info!(case_id = %case.id, status = ?case.status, "Case status changed");
        Ok(case)
    }

    /// Delete a case with its hearings and attendance.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.case_repo.delete(id).await? {
            return Err(AppError::NotFound(format!("Case {id}")));
        }
        tracing::info!(case_id = %id, "Case deleted");
        Ok(())
    }

    /// Attach a witness-role user to a case and enrol them on its open
    /// hearings.
    pub async fn add_witness(&self, case_id: &str, input: AddWitnessInput) -> AppResult<witness::Model> {
        input.validate()?;
        self.case_repo.get_by_id(case_id).await?;
        self.require_role(&input.user_id, UserRole::Witness).await?;

        let model = witness::ActiveModel {
            id: Set(self.id_gen.generate()),
            case_id: Set(case_id.to_string()),
            user_id: Set(input.user_id),
            address: Set(input.address),
            statement_recorded: Set(input.statement_recorded),
            created_at: Set(Utc::now().into()),
        };
        let witness = self.witness_repo.create(model).await?;

        for hearing in self.hearing_repo.find_open_by_case(case_id).await? {
            if self
                .attendance_repo
                .find_by_session_and_user(&hearing.id, &witness.user_id)
                .await?
                .is_none()
            {
                self.attendance_repo
                    .create(unmarked_row(
                        self.id_gen.generate(),
                        &hearing.id,
                        case_id,
                        hearing.hearing_date,
                        witness.user_id.clone(),
                        AttendeeRole::Witness,
                    ))
                    .await?;
            }
        }

        Ok(witness)
    }

    /// Witnesses of a case the actor may see.
    pub async fn list_witnesses(
        &self,
        actor: &user::Model,
        case_id: &str,
    ) -> AppResult<Vec<witness::Model>> {
        let case = self.case_repo.get_by_id(case_id).await?;
        self.ensure_can_view(actor, &case).await?;
        self.witness_repo.find_by_case(case_id).await
    }

    async fn ensure_can_view(&self, actor: &user::Model, case: &case::Model) -> AppResult<()> {
        let allowed = match actor.role {
            UserRole::Admin | UserRole::LiaisonOfficer => true,
            UserRole::InvestigatingOfficer => {
                case.investigating_officer_id == actor.id
                    || case.liaison_officer_id.as_deref() == Some(actor.id.as_str())
            }
            UserRole::Witness => self
                .witness_repo
                .find_case_ids_for_user(&actor.id)
                .await?
                .contains(&case.id),
        };

        if allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden("You are not assigned to this case".to_string()))
        }
    }

    async fn require_role(&self, user_id: &str, role: UserRole) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if user.role != role || !user.is_active {
            return Err(AppError::Validation(format!(
                "User {user_id} is not an active {role}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bailiff_db::{
        entities::attendance::{self, AttendanceStatus},
        test_utils::fixtures,
    };
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Statement};
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> CaseService {
        service_on(Arc::new(db))
    }

    fn service_on(db: Arc<DatabaseConnection>) -> CaseService {
        CaseService::new(
            CaseRepository::new(db.clone()),
            WitnessRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            HearingRepository::new(db.clone()),
            AttendanceRepository::new(db),
        )
    }

    /// Statements that touched the attendance table, in order.
    fn attendance_writes(db: Arc<DatabaseConnection>) -> Vec<Statement> {
        Arc::try_unwrap(db)
            .unwrap()
            .into_transaction_log()
            .iter()
            .flat_map(|t| t.statements().to_vec())
            .filter(|s| {
                s.sql.starts_with(r#"INSERT INTO "attendance""#)
                    || s.sql.starts_with(r#"UPDATE "attendance""#)
            })
            .collect()
    }

    fn values(stmt: &Statement) -> String {
        format!("{:?}", stmt.values)
    }

    fn hearing_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    #[tokio::test]
    async fn test_officer_cannot_view_foreign_case() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::case("c1", "io1")]])
            .into_connection();
        let other = fixtures::user("io2", UserRole::InvestigatingOfficer);

        let err = service(db).get(&other, "c1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_witness_lists_only_attached_cases() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<witness::Model>::new()])
            .into_connection();
        let witness = fixtures::user("w1", UserRole::Witness);

        // No attachments short-circuits before the case query.
        let cases = service(db).list(&witness, None, 20, 0).await.unwrap();
        assert!(cases.is_empty());
    }

    #[tokio::test]
    async fn test_disposed_case_cannot_reopen() {
        let mut case = fixtures::case("c1", "io1");
        case.status = CaseStatus::Disposed;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();

        let err = service(db)
            .change_status("c1", CaseStatus::Ongoing)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_requires_officer_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::user("w1", UserRole::Witness)]])
            .into_connection();
        let admin = fixtures::user("a1", UserRole::Admin);

        let err = service(db)
            .create(
                &admin,
                CreateCaseInput {
                    fir_number: "12/2026".to_string(),
                    title: "State vs Rao".to_string(),
                    description: None,
                    police_station: "Central".to_string(),
                    court_name: "District Court".to_string(),
                    sections: None,
                    investigating_officer_id: "w1".to_string(),
                    liaison_officer_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_added_witness_is_enrolled_on_open_hearings() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::case("c1", "io1")]])
                .append_query_results([[fixtures::user("w2", UserRole::Witness)]])
                .append_query_results([[fixtures::witness("wt2", "c1", "w2")]])
                .append_query_results([[fixtures::hearing("h1", "c1", hearing_date(), "10:00")]])
                .append_query_results([Vec::<attendance::Model>::new()])
                .append_query_results([[fixtures::attendance(
                    "a-w2",
                    "h1",
                    "w2",
                    AttendanceStatus::NotMarked,
                )]])
                .into_connection(),
        );
        let service = service_on(db.clone());

        let witness = service
            .add_witness(
                "c1",
                AddWitnessInput {
                    user_id: "w2".to_string(),
                    address: None,
                    statement_recorded: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(witness.user_id, "w2");

        drop(service);
        let writes = attendance_writes(db);
        assert_eq!(writes.len(), 1);
        assert!(writes[0].sql.starts_with(r#"INSERT INTO "attendance""#));
        let inserted = values(&writes[0]);
        assert!(inserted.contains(r#""h1""#));
        assert!(inserted.contains(r#""w2""#));
        assert!(inserted.contains(r#""witness""#));
        assert!(inserted.contains(r#""not_marked""#));
    }

    #[tokio::test]
    async fn test_new_officer_takes_over_open_hearing_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::case("c1", "io1")]])
                .append_query_results([[fixtures::user("io2", UserRole::InvestigatingOfficer)]])
                .append_query_results([[fixtures::case("c1", "io2")]])
                .append_query_results([[
                    fixtures::hearing("h1", "c1", hearing_date(), "10:00"),
                    fixtures::hearing("h2", "c1", hearing_date(), "14:00"),
                ]])
                // Neither hearing has a row for io2 yet.
                .append_query_results([Vec::<attendance::Model>::new()])
                .append_query_results([Vec::<attendance::Model>::new()])
                .append_query_results([[fixtures::attendance(
                    "a-io2",
                    "h2",
                    "io2",
                    AttendanceStatus::NotMarked,
                )]])
                // h1 still has io1's unmarked row; on h2 io1 was already marked.
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
        let service = service_on(db.clone());

        let case = service
            .update(
                "c1",
                UpdateCaseInput {
                    investigating_officer_id: Some("io2".to_string()),
                    ..UpdateCaseInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(case.investigating_officer_id, "io2");

        drop(service);
        let writes = attendance_writes(db);
        assert_eq!(writes.len(), 3);

        assert!(writes[0].sql.starts_with(r#"UPDATE "attendance""#));
        let moved = values(&writes[0]);
        assert!(moved.contains(r#""io2""#));
        assert!(moved.contains(r#""h1""#));
        assert!(moved.contains(r#""io1""#));

        assert!(writes[1].sql.starts_with(r#"UPDATE "attendance""#));
        assert!(values(&writes[1]).contains(r#""h2""#));

        assert!(writes[2].sql.starts_with(r#"INSERT INTO "attendance""#));
        let created = values(&writes[2]);
        assert!(created.contains(r#""h2""#));
        assert!(created.contains(r#""io2""#));
        assert!(created.contains(r#""officer""#));
    }

    #[tokio::test]
    async fn test_unchanged_officer_leaves_attendance_alone() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::case("c1", "io1")]])
                .append_query_results([[fixtures::case("c1", "io1")]])
                .into_connection(),
        );
        let service = service_on(db.clone());

        service
            .update(
                "c1",
                UpdateCaseInput {
                    title: Some("State vs Rao".to_string()),
                    ..UpdateCaseInput::default()
                },
            )
            .await
            .unwrap();

        drop(service);
        assert!(attendance_writes(db).is_empty());
    }
}
