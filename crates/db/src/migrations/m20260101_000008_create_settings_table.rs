//! Create settings table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Settings::OrganisationName)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(bool_on(Settings::SmsEnabled))
                    .col(bool_on(Settings::EmailEnabled))
                    .col(bool_on(Settings::WeeklyRemindersEnabled))
                    .col(bool_on(Settings::DayOfRemindersEnabled))
                    .col(bool_on(Settings::PostHearingEnabled))
                    .col(ColumnDef::new(Settings::UpdatedBy).string_len(32))
                    .col(ColumnDef::new(Settings::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        let seed = Query::insert()
            .into_table(Settings::Table)
            .columns([Settings::Id, Settings::OrganisationName])
            .values_panic(["global".into(), "Court Attendance".into()])
            .to_owned();
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await
    }
}

fn bool_on(col: Settings) -> ColumnDef {
    ColumnDef::new(col).boolean().not_null().default(true).to_owned()
}

#[derive(Iden, Clone, Copy)]
enum Settings {
    Table,
    Id,
    OrganisationName,
    SmsEnabled,
    EmailEnabled,
    WeeklyRemindersEnabled,
    DayOfRemindersEnabled,
    PostHearingEnabled,
    UpdatedBy,
    UpdatedAt,
}
