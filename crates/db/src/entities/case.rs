//! Court case entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::attendance::AttendanceStatus;

/// Case lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "ongoing")]
    Ongoing,
    #[sea_orm(string_value = "disposed")]
    Disposed,
    #[sea_orm(string_value = "adjourned")]
    Adjourned,
}

impl CaseStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `pending -> ongoing -> disposed | adjourned`, and an adjourned
    /// case may resume.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ongoing)
                | (Self::Ongoing | Self::Pending, Self::Adjourned | Self::Disposed)
                | (Self::Adjourned, Self::Ongoing | Self::Disposed)
        )
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "court_case")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// First Information Report number
    #[sea_orm(unique)]
    pub fir_number: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub police_station: String,

    pub court_name: String,

    /// Legal sections invoked, e.g. "IPC 302, 34"
    #[sea_orm(nullable)]
    pub sections: Option<String>,

    pub investigating_officer_id: String,

    #[sea_orm(nullable)]
    pub liaison_officer_id: Option<String>,

    pub status: CaseStatus,

    /// Mirrors the most recent attendance mark on any of the case's hearings
    #[sea_orm(nullable)]
    pub attendance_status: Option<AttendanceStatus>,

    #[sea_orm(nullable)]
    pub next_hearing_date: Option<Date>,

    /// "HH:MM", court local time
    #[sea_orm(nullable)]
    pub next_hearing_time: Option<String>,

    pub created_by: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InvestigatingOfficerId",
        to = "super::user::Column::Id"
    )]
    InvestigatingOfficer,

    #[sea_orm(has_many = "super::hearing_session::Entity")]
    HearingSessions,

    #[sea_orm(has_many = "super::witness::Entity")]
    Witnesses,
}

impl Related<super::hearing_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HearingSessions.def()
    }
}

impl Related<super::witness::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Witnesses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_lifecycle() {
        assert!(CaseStatus::Pending.can_transition_to(CaseStatus::Ongoing));
        assert!(CaseStatus::Ongoing.can_transition_to(CaseStatus::Disposed));
        assert!(CaseStatus::Ongoing.can_transition_to(CaseStatus::Adjourned));
        assert!(CaseStatus::Adjourned.can_transition_to(CaseStatus::Ongoing));

        assert!(!CaseStatus::Disposed.can_transition_to(CaseStatus::Ongoing));
        assert!(!CaseStatus::Ongoing.can_transition_to(CaseStatus::Pending));
        assert!(!CaseStatus::Pending.can_transition_to(CaseStatus::Pending));
    }
}
