//! Database migrations.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20260101_000001_create_user_table;
mod m20260101_000002_create_case_table;
mod m20260101_000003_create_witness_table;
mod m20260101_000004_create_hearing_session_table;
mod m20260101_000005_create_attendance_table;
mod m20260101_000006_create_absence_reason_table;
mod m20260101_000007_create_notification_table;
mod m20260101_000008_create_settings_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_user_table::Migration),
            Box::new(m20260101_000002_create_case_table::Migration),
            Box::new(m20260101_000003_create_witness_table::Migration),
            Box::new(m20260101_000004_create_hearing_session_table::Migration),
            Box::new(m20260101_000005_create_attendance_table::Migration),
            Box::new(m20260101_000006_create_absence_reason_table::Migration),
            Box::new(m20260101_000007_create_notification_table::Migration),
            Box::new(m20260101_000008_create_settings_table::Migration),
        ]
    }
}
