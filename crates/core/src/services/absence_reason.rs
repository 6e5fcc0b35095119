//! Absence reason service.
//!
//! Attendees explain a missed hearing; staff review the explanation. A
//! medical reason excuses the absence straight away by moving the record to
//! `on_leave`, and raises an urgent notice to everyone responsible for the
//! case.

use chrono::Utc;
use sea_orm::{IntoActiveModel, Set};
use serde::Deserialize;
use validator::Validate;

use crate::services::dispatcher::{NotificationDispatcher, NotificationPayload};
use bailiff_common::{AppError, AppResult, IdGenerator};
use bailiff_db::{
    entities::{
        absence_reason::{self, AbsenceCategory, ReasonStatus},
        attendance::AttendanceStatus,
        notification::{NotificationPriority, NotificationType},
        user::{self, UserRole},
    },
    repositories::{AbsenceReasonRepository, AttendanceRepository, CaseRepository, UserRepository},
};

/// Input for explaining an absence.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReasonInput {
    pub attendance_id: String,

    pub category: AbsenceCategory,

    #[validate(length(min = 3, max = 4096))]
    pub reason: String,

    #[validate(url)]
    pub document_url: Option<String>,
}

/// Input for reviewing a reason.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewReasonInput {
    pub status: ReasonStatus,

    #[validate(length(max = 2048))]
    pub comment: Option<String>,
}

/// Absence reason service for business logic.
#[derive(Clone)]
pub struct AbsenceReasonService {
    reason_repo: AbsenceReasonRepository,
    attendance_repo: AttendanceRepository,
    case_repo: CaseRepository,
    user_repo: UserRepository,
    dispatcher: NotificationDispatcher,
    id_gen: IdGenerator,
}

impl AbsenceReasonService {
    /// Create a new absence reason service.
    #[must_use]
    pub const fn new(
        reason_repo: AbsenceReasonRepository,
        attendance_repo: AttendanceRepository,
        case_repo: CaseRepository,
        user_repo: UserRepository,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            reason_repo,
            attendance_repo,
            case_repo,
            user_repo,
            dispatcher,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a reason for the actor's own absence.
    pub async fn submit(
        &self,
        actor: &user::Model,
        input: SubmitReasonInput,
    ) -> AppResult<absence_reason::Model> {
        input.validate()?;

        let record = self.attendance_repo.get_by_id(&input.attendance_id).await?;
        if record.user_id != actor.id {
            return Err(AppError::Forbidden(
                "You can only explain your own absence".to_string(),
            ));
        }
        if !matches!(
            record.status,
            AttendanceStatus::Absent | AttendanceStatus::NotMarked
        ) {
            return Err(AppError::Validation(format!(
                "Attendance is {}, no reason needed",
                record.status
            )));
        }

        let open = self.reason_repo.find_by_attendance(&record.id).await?;
        if open
            .iter()
            .any(|r| matches!(r.status, ReasonStatus::Pending | ReasonStatus::Acknowledged))
        {
            return Err(AppError::Conflict(
                "A reason for this absence is already under review".to_string(),
            ));
        }

        let model = absence_reason::ActiveModel {
            id: Set(self.id_gen.generate()),
            attendance_id: Set(record.id.clone()),
            hearing_session_id: Set(record.hearing_session_id.clone()),
            case_id: Set(record.case_id.clone()),
            user_id: Set(actor.id.clone()),
            category: Set(input.category),
            reason: Set(input.reason),
            document_url: Set(input.document_url),
            status: Set(ReasonStatus::Pending),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            review_comment: Set(None),
            notification_sent: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let mut reason = self.reason_repo.create(model).await?;

        let medical = reason.category == AbsenceCategory::Medical;
        if medical
            && self
                .attendance_repo
                .transition(&record.id, record.status, AttendanceStatus::OnLeave)
                .await?
        {
            self.case_repo
                .set_attendance_status(&record.case_id, AttendanceStatus::OnLeave)
                .await?;
            tracing::info!(attendance_id = %record.id, "Medical absence excused");
        }

        let case = self.case_repo.get_by_id(&record.case_id).await?;
        let mut recipients = if medical {
            self.user_repo.find_admins().await?
        } else {
            Vec::new()
        };
        let mut officer_ids = vec![case.investigating_officer_id.clone()];
        officer_ids.extend(case.liaison_officer_id.clone());
        recipients.extend(self.user_repo.find_by_ids(&officer_ids).await?);
        recipients.sort_by(|a, b| a.id.cmp(&b.id));
        recipients.dedup_by(|a, b| a.id == b.id);
        recipients.retain(|u| u.id != actor.id && u.is_active);

        let payload = NotificationPayload {
            title: format!("Absence reason from {}", actor.name),
            message: format!(
                "{} filed a {} absence reason for FIR {}: {}",
                actor.name, reason.category, case.fir_number, reason.reason
            ),
            notification_type: NotificationType::AbsenceReason,
            priority: if medical {
                NotificationPriority::Urgent
            } else {
                NotificationPriority::Normal
            },
            case_id: Some(case.id.clone()),
            hearing_session_id: Some(reason.hearing_session_id.clone()),
        };

        let mut failures = 0;
        for recipient in &recipients {
            if let Err(e) = self.dispatcher.dispatch(recipient, &payload).await {
                failures += 1;
                tracing::error!(error = %e, recipient_id = %recipient.id, "Absence reason notice failed");
            }
        }
        if failures == 0 {
            self.reason_repo.mark_notification_sent(&reason.id).await?;
            reason.notification_sent = true;
        }

        Ok(reason)
    }

    /// Staff see every reason; everyone else only their own.
    pub async fn list(
        &self,
        actor: &user::Model,
        status: Option<ReasonStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<absence_reason::Model>> {
        let user_filter = (!actor.role.is_staff()).then_some(actor.id.as_str());
        self.reason_repo
            .list(status, user_filter, limit.min(100), offset)
            .await
    }

    /// Acknowledge, approve or reject a reason, and tell the submitter.
    pub async fn review(
        &self,
        reviewer: &user::Model,
        id: &str,
        input: ReviewReasonInput,
    ) -> AppResult<absence_reason::Model> {
        input.validate()?;
        if !matches!(reviewer.role, UserRole::Admin | UserRole::LiaisonOfficer) {
            return Err(AppError::Forbidden("Only staff can review".to_string()));
        }

        let reason = self.reason_repo.get_by_id(id).await?;
        if !reason.status.can_transition_to(input.status) {
            return Err(AppError::Validation(format!(
                "Reason cannot move from {} to {}",
                reason.status, input.status
            )));
        }

        let mut active = reason.into_active_model();
        active.status = Set(input.status);
        active.reviewed_by = Set(Some(reviewer.id.clone()));
        active.reviewed_at = Set(Some(Utc::now().into()));
        active.review_comment = Set(input.comment);
        active.updated_at = Set(Some(Utc::now().into()));
        let reason = self.reason_repo.update(active).await?;

        if let Some(submitter) = self.user_repo.find_by_id(&reason.user_id).await? {
            let payload = NotificationPayload {
                title: "Absence reason reviewed".to_string(),
                message: match &reason.review_comment {
                    Some(comment) => format!(
                        "Your absence reason was marked {}: {comment}",
                        reason.status
                    ),
                    None => format!("Your absence reason was marked {}.", reason.status),
                },
                notification_type: NotificationType::AbsenceReviewed,
                priority: NotificationPriority::Normal,
                case_id: Some(reason.case_id.clone()),
                hearing_session_id: Some(reason.hearing_session_id.clone()),
            };
            if let Err(e) = self.dispatcher.dispatch(&submitter, &payload).await {
                tracing::error!(error = %e, reason_id = %reason.id, "Review notice failed");
            }
        }

        Ok(reason)
    }
}
