//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[sea_orm(string_value = "hearing_scheduled")]
    HearingScheduled,
    #[sea_orm(string_value = "hearing_reminder")]
    HearingReminder,
    #[sea_orm(string_value = "hearing_today")]
    HearingToday,
    #[sea_orm(string_value = "attendance_confirmed")]
    AttendanceConfirmed,
    #[sea_orm(string_value = "absence_alert")]
    AbsenceAlert,
    #[sea_orm(string_value = "escalation")]
    Escalation,
    #[sea_orm(string_value = "absence_reason")]
    AbsenceReason,
    #[sea_orm(string_value = "absence_reviewed")]
    AbsenceReviewed,
    #[sea_orm(string_value = "system")]
    System,
}

/// Delivery priority. `high` and `urgent` also go out by SMS and email.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "normal")]
    #[default]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

impl NotificationPriority {
    /// Whether this priority fans out beyond the in-app channel.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    pub recipient_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    pub notification_type: NotificationType,

    pub priority: NotificationPriority,

    #[sea_orm(nullable)]
    pub case_id: Option<String>,

    #[sea_orm(nullable)]
    pub hearing_session_id: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    #[sea_orm(nullable)]
    pub read_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = false)]
    pub is_archived: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecipientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
