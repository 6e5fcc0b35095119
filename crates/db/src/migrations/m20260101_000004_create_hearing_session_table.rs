//! Create hearing session table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HearingSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HearingSession::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HearingSession::CaseId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(HearingSession::HearingDate).date().not_null())
                    .col(
                        ColumnDef::new(HearingSession::HearingTime)
                            .string_len(5)
                            .not_null(),
                    )
                    .col(ColumnDef::new(HearingSession::CourtRoom).string_len(64))
                    .col(ColumnDef::new(HearingSession::JudgeName).string_len(128))
                    .col(
                        ColumnDef::new(HearingSession::QrCode)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(HearingSession::ManualCode)
                            .string_len(16)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(HearingSession::Status)
                            .string_len(16)
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(HearingSession::WeeklyReminderSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(HearingSession::DayOfReminderSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(HearingSession::PostNotificationsSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(HearingSession::NotificationSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(HearingSession::Notes).text())
                    .col(
                        ColumnDef::new(HearingSession::CreatedBy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HearingSession::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(HearingSession::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hearing_session_case")
                            .from(HearingSession::Table, HearingSession::CaseId)
                            .to(CourtCase::Table, CourtCase::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (hearing_date, status) for the reminder scans
        manager
            .create_index(
                Index::create()
                    .name("idx_hearing_session_date_status")
                    .table(HearingSession::Table)
                    .col(HearingSession::HearingDate)
                    .col(HearingSession::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_hearing_session_case_id")
                    .table(HearingSession::Table)
                    .col(HearingSession::CaseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HearingSession::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum HearingSession {
    Table,
    Id,
    CaseId,
    HearingDate,
    HearingTime,
    CourtRoom,
    JudgeName,
    QrCode,
    ManualCode,
    Status,
    WeeklyReminderSent,
    DayOfReminderSent,
    PostNotificationsSent,
    NotificationSent,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CourtCase {
    Table,
    Id,
}
