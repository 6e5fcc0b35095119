//! Hearing session entity.

use chrono::{NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hearing session status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum HearingStatus {
    #[sea_orm(string_value = "scheduled")]
    #[default]
    Scheduled,
    #[sea_orm(string_value = "ongoing")]
    Ongoing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl HearingStatus {
    /// `scheduled -> ongoing -> completed`; scheduled or ongoing hearings can be cancelled.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Ongoing | Self::Completed | Self::Cancelled)
                | (Self::Ongoing, Self::Completed | Self::Cancelled)
        )
    }

    /// Still expecting attendees.
    pub const OPEN: [Self; 2] = [Self::Scheduled, Self::Ongoing];
}

impl fmt::Display for HearingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// The four idempotency flags carried by a hearing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentFlag {
    /// One week before the hearing.
    WeeklyReminder,
    /// Morning of the hearing.
    DayOfReminder,
    /// Attendance analysis after the hearing.
    PostHearing,
    /// "Hearing scheduled" announcement.
    Notification,
}

impl SentFlag {
    /// Column backing this flag.
    #[must_use]
    pub const fn column(self) -> Column {
        match self {
            Self::WeeklyReminder => Column::WeeklyReminderSent,
            Self::DayOfReminder => Column::DayOfReminderSent,
            Self::PostHearing => Column::PostNotificationsSent,
            Self::Notification => Column::NotificationSent,
        }
    }

    /// Read the flag from a model.
    #[must_use]
    pub const fn is_set(self, hearing: &Model) -> bool {
        match self {
            Self::WeeklyReminder => hearing.weekly_reminder_sent,
            Self::DayOfReminder => hearing.day_of_reminder_sent,
            Self::PostHearing => hearing.post_notifications_sent,
            Self::Notification => hearing.notification_sent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hearing_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub case_id: String,

    pub hearing_date: Date,

    /// "HH:MM", court local time
    pub hearing_time: String,

    #[sea_orm(nullable)]
    pub court_room: Option<String>,

    #[sea_orm(nullable)]
    pub judge_name: Option<String>,

    /// Encoded QR payload; also the lookup key for scans
    #[sea_orm(column_type = "Text", unique)]
    #[serde(skip_serializing)]
    pub qr_code: String,

    /// Human-typed fallback code
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub manual_code: String,

    pub status: HearingStatus,

    #[sea_orm(default_value = false)]
    pub weekly_reminder_sent: bool,

    #[sea_orm(default_value = false)]
    pub day_of_reminder_sent: bool,

    #[sea_orm(default_value = false)]
    pub post_notifications_sent: bool,

    #[sea_orm(default_value = false)]
    pub notification_sent: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_by: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Parsed hearing time, if well-formed.
    #[must_use]
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.hearing_time, "%H:%M").ok()
    }

    /// Scheduled start as an instant in the court timezone.
    #[must_use]
    pub fn scheduled_start(&self, tz: Tz) -> Option<chrono::DateTime<Tz>> {
        let naive = NaiveDateTime::new(self.hearing_date, self.time_of_day()?);
        tz.from_local_datetime(&naive).earliest()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::case::Entity",
        from = "Column::CaseId",
        to = "super::case::Column::Id",
        on_delete = "Cascade"
    )]
    Case,

    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
}

impl Related<super::case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Case.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn hearing(time: &str) -> Model {
        Model {
            id: "h1".to_string(),
            case_id: "c1".to_string(),
            hearing_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            hearing_time: time.to_string(),
            court_room: None,
            judge_name: None,
            qr_code: "{}".to_string(),
            manual_code: "ABCD2345".to_string(),
            status: HearingStatus::Scheduled,
            weekly_reminder_sent: false,
            day_of_reminder_sent: true,
            post_notifications_sent: false,
            notification_sent: false,
            notes: None,
            created_by: "admin".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_scheduled_start_in_court_timezone() {
        let start = hearing("10:00")
            .scheduled_start(chrono_tz::Asia::Kolkata)
            .unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-02T10:00:00+05:30");
    }

    #[test]
    fn test_malformed_time_has_no_start() {
        assert!(hearing("10am").scheduled_start(chrono_tz::UTC).is_none());
    }

    #[test]
    fn test_sent_flags() {
        let h = hearing("10:00");
        assert!(!SentFlag::WeeklyReminder.is_set(&h));
        assert!(SentFlag::DayOfReminder.is_set(&h));
        assert!(!SentFlag::PostHearing.is_set(&h));
        assert!(!SentFlag::Notification.is_set(&h));
    }

    #[test]
    fn test_hearing_lifecycle() {
        assert!(HearingStatus::Scheduled.can_transition_to(HearingStatus::Ongoing));
        assert!(HearingStatus::Ongoing.can_transition_to(HearingStatus::Completed));
        assert!(HearingStatus::Scheduled.can_transition_to(HearingStatus::Cancelled));
        assert!(!HearingStatus::Completed.can_transition_to(HearingStatus::Scheduled));
        assert!(!HearingStatus::Cancelled.can_transition_to(HearingStatus::Ongoing));
    }
}
