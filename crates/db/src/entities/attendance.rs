//! Attendance entity: one row per (hearing session, attendee).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attendance status of one attendee at one hearing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "not_marked")]
    #[default]
    NotMarked,
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "absent")]
    Absent,
    #[sea_orm(string_value = "late")]
    Late,
    #[sea_orm(string_value = "on_leave")]
    OnLeave,
    #[sea_orm(string_value = "exempted")]
    Exempted,
}

impl AttendanceStatus {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotMarked => "not_marked",
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::OnLeave => "on_leave",
            Self::Exempted => "exempted",
        }
    }

    /// Statuses only move forward out of `not_marked`.
    ///
    /// `absent -> on_leave` is the one move between terminal statuses; it
    /// happens when a medical absence reason is filed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::NotMarked, Self::NotMarked) => false,
            (Self::NotMarked, _) | (Self::Absent, Self::OnLeave) => true,
            _ => false,
        }
    }

    /// The attendee showed up.
    #[must_use]
    pub const fn counts_as_present(self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }

    /// The attendee did not show up and has no recorded excuse.
    #[must_use]
    pub const fn counts_as_absent(self) -> bool {
        matches!(self, Self::Absent | Self::NotMarked)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a mark was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum MarkMethod {
    #[sea_orm(string_value = "qr_scan")]
    QrScan,
    #[sea_orm(string_value = "manual")]
    Manual,
}

/// The attendee's role at the hearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AttendeeRole {
    #[sea_orm(string_value = "officer")]
    Officer,
    #[sea_orm(string_value = "witness")]
    Witness,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub hearing_session_id: String,

    pub case_id: String,

    pub user_id: String,

    pub attendee_role: AttendeeRole,

    /// Copy of the session's date, for rolling-window absence counts
    pub hearing_date: Date,

    pub status: AttendanceStatus,

    #[sea_orm(nullable)]
    pub marked_method: Option<MarkMethod>,

    #[sea_orm(nullable)]
    pub marked_by: Option<String>,

    #[sea_orm(nullable)]
    pub arrival_time: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub qr_scanned_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    #[sea_orm(nullable)]
    pub verified_by: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::hearing_session::Entity",
        from = "Column::HearingSessionId",
        to = "super::hearing_session::Column::Id",
        on_delete = "Cascade"
    )]
    HearingSession,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::hearing_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HearingSession.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
