//! User (auth) entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a user plays in the attendance workflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "investigating_officer")]
    InvestigatingOfficer,
    #[sea_orm(string_value = "liaison_officer")]
    LiaisonOfficer,
    #[sea_orm(string_value = "witness")]
    Witness,
}

impl UserRole {
    /// Roles allowed to manage cases and hearings.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::LiaisonOfficer)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    /// E.164 phone number, used for SMS
    #[sea_orm(nullable)]
    pub phone: Option<String>,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,

    /// Officer badge number
    #[sea_orm(nullable)]
    pub badge_number: Option<String>,

    #[sea_orm(nullable)]
    pub police_station: Option<String>,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,

    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
