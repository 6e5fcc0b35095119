//! Hearing notifications.
//!
//! Message content is decided by pure planners (`plan_*`) that turn a hearing
//! and its audience into [`PlannedNotice`]s; [`HearingNotificationService`]
//! gathers the inputs from the database and hands the plan to the
//! [`NotificationDispatcher`]. The service never touches the sent flags, its
//! callers own those.

use std::collections::HashMap;

use chrono::Duration;
use chrono_tz::Tz;
use serde::Serialize;

use crate::services::dispatcher::{NotificationDispatcher, NotificationPayload};
use bailiff_common::{AppError, AppResult, SharedClock};
use bailiff_db::{
    entities::{
        attendance::{self, AttendeeRole},
        case, hearing_session,
        notification::{NotificationPriority, NotificationType},
    },
    repositories::{AttendanceRepository, CaseRepository, UserRepository, WitnessRepository},
};

/// Officer absences within [`REPEAT_ABSENCE_WINDOW_DAYS`] that trigger an
/// escalation to administrators.
pub const REPEAT_ABSENCE_THRESHOLD: u64 = 3;

/// Rolling window for counting officer absences.
pub const REPEAT_ABSENCE_WINDOW_DAYS: i64 = 30;

/// Who showed up at a hearing, from the officer's and witnesses' records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttendanceOutcome {
    /// Nobody is absent.
    AllPresent {
        /// Whether the officer was marked present or late.
        officer_present: bool,
        /// Witnesses marked present or late.
        present_witnesses: Vec<String>,
    },
    /// The officer is absent, every witness accounted for.
    OfficerAbsent,
    /// The officer attended or is excused; some witnesses are absent.
    WitnessesAbsent {
        /// Absent witness user IDs.
        absent_witnesses: Vec<String>,
    },
    /// The officer and at least one witness are absent.
    BothAbsent {
        /// Absent witness user IDs.
        absent_witnesses: Vec<String>,
    },
    /// No records, or nobody either present or absent.
    Indeterminate,
}

impl AttendanceOutcome {
    /// Classify a hearing's attendance records. The officer is whoever holds
    /// the officer row, which need not be the case's current officer.
    #[must_use]
    pub fn classify(records: &[attendance::Model]) -> Self {
        if records.is_empty() {
            return Self::Indeterminate;
        }

        let officer = officer_record(records);
        let officer_absent = officer.is_some_and(|r| r.status.counts_as_absent());
        let officer_present = officer.is_some_and(|r| r.status.counts_as_present());

        let witnesses = || {
            records
                .iter()
                .filter(|r| r.attendee_role == AttendeeRole::Witness)
        };
        let absent_witnesses: Vec<String> = witnesses()
            .filter(|r| r.status.counts_as_absent())
            .map(|r| r.user_id.clone())
            .collect();
        let present_witnesses: Vec<String> = witnesses()
            .filter(|r| r.status.counts_as_present())
            .map(|r| r.user_id.clone())
            .collect();

        match (officer_absent, absent_witnesses.is_empty()) {
            (true, false) => Self::BothAbsent { absent_witnesses },
            (true, true) => Self::OfficerAbsent,
            (false, false) => Self::WitnessesAbsent { absent_witnesses },
            (false, true) if officer_present || !present_witnesses.is_empty() => Self::AllPresent {
                officer_present,
                present_witnesses,
            },
            (false, true) => Self::Indeterminate,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AllPresent { .. } => "all_present",
            Self::OfficerAbsent => "officer_absent",
            Self::WitnessesAbsent { .. } => "witnesses_absent",
            Self::BothAbsent { .. } => "both_absent",
            Self::Indeterminate => "indeterminate",
        }
    }
}

/// The officer row of a hearing, if there is one.
#[must_use]
pub fn officer_record(records: &[attendance::Model]) -> Option<&attendance::Model> {
    records
        .iter()
        .find(|r| r.attendee_role == AttendeeRole::Officer)
}

/// One notification for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotice {
    /// Recipient user ID.
    pub recipient_id: String,
    /// Content.
    pub payload: NotificationPayload,
}

/// Notifications decided after a hearing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostHearingPlan {
    /// Notices to the officer and witnesses.
    pub notices: Vec<PlannedNotice>,
    /// Alert for every administrator, if the outcome warrants one.
    pub admin_alert: Option<NotificationPayload>,
}

/// The facts about a hearing that go into message text.
#[derive(Debug, Clone, Copy)]
pub struct HearingBrief<'a> {
    /// The case.
    pub case: &'a case::Model,
    /// The hearing.
    pub hearing: &'a hearing_session::Model,
}

impl HearingBrief<'_> {
    fn case_ref(&self) -> String {
        format!("FIR {} ({})", self.case.fir_number, self.case.title)
    }

    fn when(&self) -> String {
        format!(
            "{} at {}",
            self.hearing.hearing_date.format("%d %b %Y"),
            self.hearing.hearing_time
        )
    }

    fn venue(&self) -> String {
        match &self.hearing.court_room {
            Some(room) => format!("{}, court room {room}", self.case.court_name),
            None => self.case.court_name.clone(),
        }
    }

    fn payload(
        &self,
        notification_type: NotificationType,
        priority: NotificationPriority,
        title: String,
        message: String,
    ) -> NotificationPayload {
        NotificationPayload {
            title,
            message,
            notification_type,
            priority,
            case_id: Some(self.case.id.clone()),
            hearing_session_id: Some(self.hearing.id.clone()),
        }
    }

    fn notice(&self, recipient_id: &str, payload: NotificationPayload) -> PlannedNotice {
        PlannedNotice {
            recipient_id: recipient_id.to_string(),
            payload,
        }
    }
}

/// Reminder one week before the hearing.
#[must_use]
pub fn plan_weekly_reminder(
    brief: HearingBrief<'_>,
    officer_id: &str,
    witness_ids: &[String],
) -> Vec<PlannedNotice> {
    let mut notices = vec![brief.notice(
        officer_id,
        brief.payload(
            NotificationType::HearingReminder,
            NotificationPriority::Normal,
            format!("Hearing in one week: {}", brief.case_ref()),
            format!(
                "The hearing for {} is on {} at {}. Please prepare the case diary, \
                 charge sheet and any exhibits you will need to produce.",
                brief.case_ref(),
                brief.when(),
                brief.venue()
            ),
        ),
    )];

    notices.extend(witness_ids.iter().map(|witness_id| {
        brief.notice(
            witness_id,
            brief.payload(
                NotificationType::HearingReminder,
                NotificationPriority::High,
                "Court appearance in one week".to_string(),
                format!(
                    "You are required to appear as a witness on {} at {}. \
                     Your appearance is mandatory. Bring a photo ID.",
                    brief.when(),
                    brief.venue()
                ),
            ),
        )
    }));

    notices
}

/// Reminder on the morning of the hearing.
#[must_use]
pub fn plan_day_of_reminder(
    brief: HearingBrief<'_>,
    officer_id: &str,
    witness_ids: &[String],
) -> Vec<PlannedNotice> {
    let mut notices = vec![brief.notice(
        officer_id,
        brief.payload(
            NotificationType::HearingToday,
            NotificationPriority::High,
            format!("TODAY: hearing for {}", brief.case_ref()),
            format!(
                "Your hearing is today at {}, {}. Scan the hearing QR code on arrival \
                 to record your attendance.",
                brief.hearing.hearing_time,
                brief.venue()
            ),
        ),
    )];

    notices.extend(witness_ids.iter().map(|witness_id| {
        brief.notice(
            witness_id,
            brief.payload(
                NotificationType::HearingToday,
                NotificationPriority::Urgent,
                "TODAY: you must appear in court".to_string(),
                format!(
                    "You must appear in court today at {}, {}. Scan the QR code at the \
                     court room or give the clerk your attendance code on arrival.",
                    brief.hearing.hearing_time,
                    brief.venue()
                ),
            ),
        )
    }));

    notices
}

/// Announcement of a newly scheduled hearing.
#[must_use]
pub fn plan_hearing_scheduled(
    brief: HearingBrief<'_>,
    officer_ids: &[String],
    witness_ids: &[String],
) -> Vec<PlannedNotice> {
    let officer_notices = officer_ids.iter().map(|id| {
        brief.notice(
            id,
            brief.payload(
                NotificationType::HearingScheduled,
                NotificationPriority::Normal,
                format!("Hearing scheduled: {}", brief.case_ref()),
                format!("A hearing has been scheduled on {} at {}.", brief.when(), brief.venue()),
            ),
        )
    });

    let witness_notices = witness_ids.iter().map(|id| {
        brief.notice(
            id,
            brief.payload(
                NotificationType::HearingScheduled,
                NotificationPriority::High,
                "You have been summoned to a court hearing".to_string(),
                format!(
                    "You are summoned to appear as a witness on {} at {}.",
                    brief.when(),
                    brief.venue()
                ),
            ),
        )
    });

    officer_notices.chain(witness_notices).collect()
}

/// Notifications after a hearing.
///
/// `officer_absences` is the officer's absence count in the rolling window,
/// including this hearing; it is only consulted for [`AttendanceOutcome::OfficerAbsent`].
#[must_use]
pub fn plan_post_hearing(
    brief: HearingBrief<'_>,
    officer_id: &str,
    outcome: &AttendanceOutcome,
    officer_absences: Option<u64>,
) -> PostHearingPlan {
    let officer_alert = || {
        brief.notice(
            officer_id,
            brief.payload(
                NotificationType::AbsenceAlert,
                NotificationPriority::High,
                format!("Absence recorded: {}", brief.case_ref()),
                format!(
                    "You were marked absent from the hearing on {}. Submit an absence \
                     reason through the dashboard.",
                    brief.when()
                ),
            ),
        )
    };
    let witness_alert = |witness_id: &String| {
        brief.notice(
            witness_id,
            brief.payload(
                NotificationType::AbsenceAlert,
                NotificationPriority::Urgent,
                "You missed a mandatory court appearance".to_string(),
                format!(
                    "You did not appear at the hearing on {} at {}. Failure to appear \
                     when summoned may lead to legal consequences, including a warrant. \
                     Submit your reason for absence immediately.",
                    brief.when(),
                    brief.venue()
                ),
            ),
        )
    };

    match outcome {
        AttendanceOutcome::AllPresent {
            officer_present,
            present_witnesses,
        } => {
            let confirmation = |id: &str| {
                brief.notice(
                    id,
                    brief.payload(
                        NotificationType::AttendanceConfirmed,
                        NotificationPriority::Low,
                        "Attendance confirmed".to_string(),
                        format!(
                            "Thank you for attending the hearing for {} on {}.",
                            brief.case_ref(),
                            brief.when()
                        ),
                    ),
                )
            };
            let mut notices: Vec<PlannedNotice> =
                present_witnesses.iter().map(|id| confirmation(id)).collect();
            if *officer_present {
                notices.insert(0, confirmation(officer_id));
            }
            PostHearingPlan {
                notices,
                admin_alert: None,
            }
        }
        AttendanceOutcome::OfficerAbsent => {
            let admin_alert = officer_absences
                .filter(|n| *n >= REPEAT_ABSENCE_THRESHOLD)
                .map(|n| {
                    brief.payload(
                        NotificationType::Escalation,
                        NotificationPriority::Urgent,
                        format!("Repeated officer absence: {}", brief.case_ref()),
                        format!(
                            "Officer {officer_id} missed the hearing on {}. This is their \
                             absence number {n} in the last {REPEAT_ABSENCE_WINDOW_DAYS} days.",
                            brief.when()
                        ),
                    )
                });
            PostHearingPlan {
                notices: vec![officer_alert()],
                admin_alert,
            }
        }
        AttendanceOutcome::WitnessesAbsent { absent_witnesses } => PostHearingPlan {
            notices: absent_witnesses.iter().map(witness_alert).collect(),
            admin_alert: None,
        },
        AttendanceOutcome::BothAbsent { absent_witnesses } => {
            let mut notices = vec![officer_alert()];
            notices.extend(absent_witnesses.iter().map(witness_alert));
            PostHearingPlan {
                notices,
                admin_alert: Some(brief.payload(
                    NotificationType::Escalation,
                    NotificationPriority::Urgent,
                    format!("Officer and witnesses absent: {}", brief.case_ref()),
                    format!(
                        "Both the investigating officer ({officer_id}) and {} witness(es) \
                         were absent from the hearing on {} at {}.",
                        absent_witnesses.len(),
                        brief.when(),
                        brief.venue()
                    ),
                )),
            }
        }
        AttendanceOutcome::Indeterminate => PostHearingPlan::default(),
    }
}

/// Sends hearing notifications.
#[derive(Clone)]
pub struct HearingNotificationService {
    case_repo: CaseRepository,
    witness_repo: WitnessRepository,
    attendance_repo: AttendanceRepository,
    user_repo: UserRepository,
    dispatcher: NotificationDispatcher,
    clock: SharedClock,
    court_tz: Tz,
}

impl HearingNotificationService {
    /// Create a new hearing notification service.
    #[must_use]
    pub fn new(
        case_repo: CaseRepository,
        witness_repo: WitnessRepository,
        attendance_repo: AttendanceRepository,
        user_repo: UserRepository,
        dispatcher: NotificationDispatcher,
        clock: SharedClock,
        court_tz: Tz,
    ) -> Self {
        Self {
            case_repo,
            witness_repo,
            attendance_repo,
            user_repo,
            dispatcher,
            clock,
            court_tz,
        }
    }

    /// One-week reminder. Returns the number of notifications delivered.
    pub async fn send_weekly_reminder(
        &self,
        hearing: &hearing_session::Model,
    ) -> AppResult<usize> {
        let case = self.case_repo.get_by_id(&hearing.case_id).await?;
        let witness_ids = self.witness_ids(&case.id).await?;
        let brief = HearingBrief { case: &case, hearing };
        let plan = plan_weekly_reminder(brief, &case.investigating_officer_id, &witness_ids);
        self.deliver(plan).await
    }

    /// Day-of reminder. Returns the number of notifications delivered.
    pub async fn send_day_of_reminder(
        &self,
        hearing: &hearing_session::Model,
    ) -> AppResult<usize> {
        let case = self.case_repo.get_by_id(&hearing.case_id).await?;
        let witness_ids = self.witness_ids(&case.id).await?;
        let brief = HearingBrief { case: &case, hearing };
        let plan = plan_day_of_reminder(brief, &case.investigating_officer_id, &witness_ids);
        self.deliver(plan).await
    }

    /// "Hearing scheduled" announcement to both officers and the witnesses.
    pub async fn send_hearing_scheduled(
        &self,
        hearing: &hearing_session::Model,
    ) -> AppResult<usize> {
        let case = self.case_repo.get_by_id(&hearing.case_id).await?;
        let witness_ids = self.witness_ids(&case.id).await?;

        let mut officer_ids = vec![case.investigating_officer_id.clone()];
        if let Some(liaison) = &case.liaison_officer_id {
            if liaison != &case.investigating_officer_id {
                officer_ids.push(liaison.clone());
            }
        }

        let brief = HearingBrief { case: &case, hearing };
        let plan = plan_hearing_scheduled(brief, &officer_ids, &witness_ids);
        self.deliver(plan).await
    }

    /// Post-hearing analysis: finalise unmarked records as absent, classify,
    /// notify.
    pub async fn send_post_hearing(
        &self,
        hearing: &hearing_session::Model,
    ) -> AppResult<AttendanceOutcome> {
        let case = self.case_repo.get_by_id(&hearing.case_id).await?;

        let finalised = self.attendance_repo.finalize_unmarked(&hearing.id).await?;
        if finalised > 0 {
            tracing::info!(
                hearing_id = %hearing.id,
                count = finalised,
                "Unmarked attendance finalised as absent"
            );
        }

        let records = self.attendance_repo.find_by_session(&hearing.id).await?;
        let officer_id = officer_record(&records)
            .map_or(case.investigating_officer_id.as_str(), |r| r.user_id.as_str());
        let outcome = AttendanceOutcome::classify(&records);

        if outcome == AttendanceOutcome::Indeterminate {
            tracing::warn!(
                hearing_id = %hearing.id,
                case_id = %case.id,
                records = records.len(),
                "Post-hearing outcome indeterminate; no notifications sent"
            );
            return Ok(outcome);
        }

        let officer_absences = if outcome == AttendanceOutcome::OfficerAbsent {
            let since = self.clock.today_in(self.court_tz)
                - Duration::days(REPEAT_ABSENCE_WINDOW_DAYS);
            Some(
                self.attendance_repo
                    .count_absences_since(officer_id, since)
                    .await?,
            )
        } else {
            None
        };

        let brief = HearingBrief {
            case: &case,
            hearing,
        };
        let plan = plan_post_hearing(brief, officer_id, &outcome, officer_absences);

        tracing::info!(
            hearing_id = %hearing.id,
            outcome = outcome.label(),
            notices = plan.notices.len(),
            escalated = plan.admin_alert.is_some(),
            "Post-hearing notifications planned"
        );

        self.deliver(plan.notices).await?;
        if let Some(alert) = plan.admin_alert {
            self.notify_admins(&alert).await?;
        }

        Ok(outcome)
    }

    /// Send a payload to every administrator. Per-recipient failures are
    /// logged and skipped; returns how many were delivered.
    pub async fn notify_admins(&self, payload: &NotificationPayload) -> AppResult<usize> {
        let admins = self.user_repo.find_admins().await?;
        let mut delivered = 0;
        for admin in &admins {
            match self.dispatcher.dispatch(admin, payload).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    tracing::error!(error = %e, admin_id = %admin.id, "Admin notification failed");
                }
            }
        }
        Ok(delivered)
    }

    /// Dispatch every notice. Each recipient is attempted; the first failure
    /// is returned after the rest have been tried.
    pub async fn deliver(&self, notices: Vec<PlannedNotice>) -> AppResult<usize> {
        if notices.is_empty() {
            return Ok(0);
        }

        let mut ids: Vec<String> = notices.iter().map(|n| n.recipient_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let users: HashMap<String, _> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut delivered = 0;
        let mut first_error: Option<AppError> = None;
        for notice in &notices {
            let Some(user) = users.get(&notice.recipient_id).filter(|u| u.is_active) else {
                tracing::warn!(
                    recipient_id = %notice.recipient_id,
                    "Skipping notification for missing or inactive user"
                );
                continue;
            };

            match self.dispatcher.dispatch(user, &notice.payload).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    tracing::error!(error = %e, recipient_id = %user.id, "Notification failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    async fn witness_ids(&self, case_id: &str) -> AppResult<Vec<String>> {
        Ok(self
            .witness_repo
            .find_by_case(case_id)
            .await?
            .into_iter()
            .map(|w| w.user_id)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bailiff_common::{FixedClock, clock::Clock};
    use bailiff_db::{
        entities::{
            attendance::AttendanceStatus, settings, user::UserRole,
        },
        repositories::{NotificationRepository, SettingsRepository},
        test_utils::fixtures,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn hearing_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn record(user_id: &str, status: AttendanceStatus) -> attendance::Model {
        fixtures::attendance(&format!("a-{user_id}"), "h1", user_id, status)
    }

    #[test]
    fn test_classify_empty_is_indeterminate() {
        assert_eq!(
            AttendanceOutcome::classify(&[]),
            AttendanceOutcome::Indeterminate
        );
    }

    #[test]
    fn test_classify_all_present() {
        let records = [
            record("io1", AttendanceStatus::Present),
            record("w1", AttendanceStatus::Late),
            record("w2", AttendanceStatus::Exempted),
        ];
        assert_eq!(
            AttendanceOutcome::classify(&records),
            AttendanceOutcome::AllPresent {
                officer_present: true,
                present_witnesses: vec!["w1".to_string()],
            }
        );
    }

    #[test]
    fn test_classify_officer_absent() {
        let records = [
            record("io1", AttendanceStatus::Absent),
            record("w1", AttendanceStatus::Present),
        ];
        assert_eq!(
            AttendanceOutcome::classify(&records),
            AttendanceOutcome::OfficerAbsent
        );
    }

    #[test]
    fn test_classify_witnesses_absent_when_officer_on_leave() {
        let records = [
            record("io1", AttendanceStatus::OnLeave),
            record("w1", AttendanceStatus::NotMarked),
        ];
        assert_eq!(
            AttendanceOutcome::classify(&records),
            AttendanceOutcome::WitnessesAbsent {
                absent_witnesses: vec!["w1".to_string()],
            }
        );
    }

    #[test]
    fn test_classify_both_absent() {
        let records = [
            record("io1", AttendanceStatus::Absent),
            record("w1", AttendanceStatus::Absent),
            record("w2", AttendanceStatus::Present),
        ];
        assert_eq!(
            AttendanceOutcome::classify(&records),
            AttendanceOutcome::BothAbsent {
                absent_witnesses: vec!["w1".to_string()],
            }
        );
    }

    #[test]
    fn test_classify_follows_officer_row_not_current_assignment() {
        // The case has since moved to io2; io1 held the officer row and missed it.
        let records = [
            record("io1", AttendanceStatus::Absent),
            record("w1", AttendanceStatus::Present),
        ];
        assert_eq!(
            AttendanceOutcome::classify(&records),
            AttendanceOutcome::OfficerAbsent
        );
        assert_eq!(officer_record(&records).unwrap().user_id, "io1");
    }

    #[test]
    fn test_classify_everyone_excused_is_indeterminate() {
        let records = [
            record("io1", AttendanceStatus::OnLeave),
            record("w1", AttendanceStatus::Exempted),
        ];
        assert_eq!(
            AttendanceOutcome::classify(&records),
            AttendanceOutcome::Indeterminate
        );
    }

    #[test]
    fn test_weekly_plan_splits_audience() {
        let case = fixtures::case("c1", "io1");
        let hearing = fixtures::hearing("h1", "c1", hearing_date(), "10:00");
        let brief = HearingBrief {
            case: &case,
            hearing: &hearing,
        };

        let plan = plan_weekly_reminder(brief, "io1", &["w1".to_string(), "w2".to_string()]);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].recipient_id, "io1");
        assert!(plan[0].payload.message.contains("case diary"));
        assert!(plan[1].payload.message.contains("mandatory"));
        assert_eq!(plan[2].recipient_id, "w2");
        assert!(plan.iter().all(|n| n.payload.hearing_session_id.as_deref() == Some("h1")));
    }

    #[test]
    fn test_day_of_plan_escalates_priority() {
        let case = fixtures::case("c1", "io1");
        let hearing = fixtures::hearing("h1", "c1", hearing_date(), "10:00");
        let brief = HearingBrief {
            case: &case,
            hearing: &hearing,
        };

        let plan = plan_day_of_reminder(brief, "io1", &["w1".to_string()]);
        assert_eq!(plan[0].payload.priority, NotificationPriority::High);
        assert_eq!(plan[1].payload.priority, NotificationPriority::Urgent);
        assert!(plan[1].payload.title.starts_with("TODAY"));
    }

    #[test]
    fn test_post_hearing_mixed_absence_scenario() {
        let case = fixtures::case("c1", "io1");
        let hearing = fixtures::hearing("h1", "c1", hearing_date(), "10:00");
        let brief = HearingBrief {
            case: &case,
            hearing: &hearing,
        };
        let records = [
            record("io1", AttendanceStatus::Absent),
            record("w1", AttendanceStatus::Absent),
            record("w2", AttendanceStatus::Present),
        ];
        let outcome = AttendanceOutcome::classify(&records);

        let plan = plan_post_hearing(brief, "io1", &outcome, None);

        let recipients: Vec<&str> = plan.notices.iter().map(|n| n.recipient_id.as_str()).collect();
        assert_eq!(recipients, vec!["io1", "w1"]);
        assert_eq!(plan.notices[0].payload.notification_type, NotificationType::AbsenceAlert);
        assert!(plan.notices[1].payload.message.contains("legal consequences"));

        let alert = plan.admin_alert.unwrap();
        assert_eq!(alert.notification_type, NotificationType::Escalation);
        assert!(alert.title.contains("Officer and witnesses absent"));
    }

    #[test]
    fn test_officer_absence_escalates_on_third() {
        let case = fixtures::case("c1", "io1");
        let hearing = fixtures::hearing("h1", "c1", hearing_date(), "10:00");
        let brief = HearingBrief {
            case: &case,
            hearing: &hearing,
        };
        let outcome = AttendanceOutcome::OfficerAbsent;

        let second = plan_post_hearing(brief, "io1", &outcome, Some(2));
        assert!(second.admin_alert.is_none());
        assert_eq!(second.notices.len(), 1);

        let third = plan_post_hearing(brief, "io1", &outcome, Some(3));
        assert!(third.admin_alert.unwrap().message.contains("absence number 3"));
    }

    #[test]
    fn test_all_present_courtesy_only_for_attendees() {
        let case = fixtures::case("c1", "io1");
        let hearing = fixtures::hearing("h1", "c1", hearing_date(), "10:00");
        let brief = HearingBrief {
            case: &case,
            hearing: &hearing,
        };
        let outcome = AttendanceOutcome::AllPresent {
            officer_present: false,
            present_witnesses: vec!["w1".to_string()],
        };

        let plan = plan_post_hearing(brief, "io1", &outcome, None);
        assert_eq!(plan.notices.len(), 1);
        assert_eq!(plan.notices[0].recipient_id, "w1");
        assert_eq!(plan.notices[0].payload.priority, NotificationPriority::Low);
    }

    #[tokio::test]
    async fn test_post_hearing_service_notifies_and_escalates() {
        let notif = fixtures::notification("n", "x");
        let settings_row = settings::Model::defaults();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // case
                .append_query_results([[fixtures::case("c1", "io1")]])
                // attendance after finalising
                .append_query_results([vec![
                    record("io1", AttendanceStatus::Absent),
                    record("w1", AttendanceStatus::Absent),
                    record("w2", AttendanceStatus::Present),
                ]])
                // recipients
                .append_query_results([vec![
                    fixtures::user("io1", UserRole::InvestigatingOfficer),
                    fixtures::user("w1", UserRole::Witness),
                ]])
                // officer alert, then witness alert
                .append_query_results([[notif.clone()]])
                .append_query_results([[settings_row.clone()]])
                .append_query_results([[notif.clone()]])
                .append_query_results([[settings_row.clone()]])
                // admins, then their escalation
                .append_query_results([[fixtures::user("a1", UserRole::Admin)]])
                .append_query_results([[notif]])
                .append_query_results([[settings_row]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let dispatcher = NotificationDispatcher::new(
            NotificationRepository::new(db.clone()),
            SettingsRepository::new(db.clone()),
            None,
            None,
            "https://attendance.example.org",
        );
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 12, 30, 0).unwrap());
        let service = HearingNotificationService::new(
            CaseRepository::new(db.clone()),
            WitnessRepository::new(db.clone()),
            AttendanceRepository::new(db.clone()),
            UserRepository::new(db),
            dispatcher,
            Arc::new(clock.clone()),
            chrono_tz::Asia::Kolkata,
        );
        assert_eq!(
            clock.today_in(chrono_tz::Asia::Kolkata),
            hearing_date()
        );

        let hearing = fixtures::hearing("h1", "c1", hearing_date(), "10:00");
        let outcome = service.send_post_hearing(&hearing).await.unwrap();
        assert!(matches!(outcome, AttendanceOutcome::BothAbsent { .. }));
    }

    #[tokio::test]
    async fn test_post_hearing_blames_the_officer_on_the_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // case reassigned to io2 after the hearing was set up for io1
                .append_query_results([[fixtures::case("c1", "io2")]])
                .append_query_results([vec![
                    record("io1", AttendanceStatus::Absent),
                    record("w1", AttendanceStatus::Present),
                ]])
                .append_query_results([[btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1)),
                }]])
                .append_query_results([[fixtures::user("io1", UserRole::InvestigatingOfficer)]])
                .append_query_results([[fixtures::notification("n", "io1")]])
                .append_query_results([[settings::Model::defaults()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let service = HearingNotificationService::new(
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
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 12, 30, 0).unwrap())),
            chrono_tz::Asia::Kolkata,
        );

        let hearing = fixtures::hearing("h1", "c1", hearing_date(), "10:00");
        let outcome = service.send_post_hearing(&hearing).await.unwrap();
        assert_eq!(outcome, AttendanceOutcome::OfficerAbsent);

        drop(service);
        let statements: Vec<_> = Arc::try_unwrap(db)
            .unwrap()
            .into_transaction_log()
            .iter()
            .flat_map(|t| t.statements().to_vec())
            .collect();
        let counted = statements
            .iter()
            .find(|s| s.sql.contains("COUNT"))
            .unwrap();
        assert!(format!("{:?}", counted.values).contains(r#""io1""#));
        let notice = statements
            .iter()
            .find(|s| s.sql.starts_with(r#"INSERT INTO "notification""#))
            .unwrap();
        let notice_values = format!("{:?}", notice.values);
        assert!(notice_values.contains(r#""io1""#));
        assert!(!notice_values.contains(r#""io2""#));
    }
}
