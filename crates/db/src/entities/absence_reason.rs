//! Absence reason entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an absence justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AbsenceCategory {
    #[sea_orm(string_value = "medical")]
    Medical,
    #[sea_orm(string_value = "personal")]
    Personal,
    #[sea_orm(string_value = "official_duty")]
    OfficialDuty,
    #[sea_orm(string_value = "emergency")]
    Emergency,
    #[sea_orm(string_value = "other")]
    Other,
}

impl AbsenceCategory {
    /// Words for message text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Medical => "medical",
            Self::Personal => "personal",
            Self::OfficialDuty => "official duty",
            Self::Emergency => "emergency",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AbsenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Review state of an absence reason.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReasonStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "acknowledged")]
    Acknowledged,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ReasonStatus {
    /// Pending reasons can be acknowledged, approved or rejected;
    /// acknowledged ones can still be decided.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Acknowledged | Self::Approved | Self::Rejected)
                | (Self::Acknowledged, Self::Approved | Self::Rejected)
        )
    }
}

impl fmt::Display for ReasonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "absence_reason")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub attendance_id: String,

    pub hearing_session_id: String,

    pub case_id: String,

    pub user_id: String,

    pub category: AbsenceCategory,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    /// Link to a supporting document, e.g. a medical certificate
    #[sea_orm(nullable)]
    pub document_url: Option<String>,

    pub status: ReasonStatus,

    #[sea_orm(nullable)]
    pub reviewed_by: Option<String>,

    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub review_comment: Option<String>,

    #[sea_orm(default_value = false)]
    pub notification_sent: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance::Entity",
        from = "Column::AttendanceId",
        to = "super::attendance::Column::Id",
        on_delete = "Cascade"
    )]
    Attendance,
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
