//! Organisation-wide settings. A single row keyed [`GLOBAL_ID`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the only settings row.
pub const GLOBAL_ID: &str = "global";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub organisation_name: String,

    #[sea_orm(default_value = true)]
    pub sms_enabled: bool,

    #[sea_orm(default_value = true)]
    pub email_enabled: bool,

    #[sea_orm(default_value = true)]
    pub weekly_reminders_enabled: bool,

    #[sea_orm(default_value = true)]
    pub day_of_reminders_enabled: bool,

    #[sea_orm(default_value = true)]
    pub post_hearing_enabled: bool,

    #[sea_orm(nullable)]
    pub updated_by: Option<String>,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Settings used before an administrator has saved any.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            id: GLOBAL_ID.to_string(),
            organisation_name: "Court Attendance".to_string(),
            sms_enabled: true,
            email_enabled: true,
            weekly_reminders_enabled: true,
            day_of_reminders_enabled: true,
            post_hearing_enabled: true,
            updated_by: None,
            updated_at: None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
