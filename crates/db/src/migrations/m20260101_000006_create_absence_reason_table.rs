//! Create absence reason table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AbsenceReason::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AbsenceReason::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AbsenceReason::AttendanceId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbsenceReason::HearingSessionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AbsenceReason::CaseId).string_len(32).not_null())
                    .col(ColumnDef::new(AbsenceReason::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(AbsenceReason::Category)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AbsenceReason::Reason).text().not_null())
                    .col(ColumnDef::new(AbsenceReason::DocumentUrl).string_len(512))
                    .col(
                        ColumnDef::new(AbsenceReason::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(AbsenceReason::ReviewedBy).string_len(32))
                    .col(ColumnDef::new(AbsenceReason::ReviewedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(AbsenceReason::ReviewComment).text())
                    .col(
                        ColumnDef::new(AbsenceReason::NotificationSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AbsenceReason::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(AbsenceReason::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_absence_reason_attendance")
                            .from(AbsenceReason::Table, AbsenceReason::AttendanceId)
                            .to(Attendance::Table, Attendance::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_absence_reason_status")
                    .table(AbsenceReason::Table)
                    .col(AbsenceReason::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AbsenceReason::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AbsenceReason {
    Table,
    Id,
    AttendanceId,
    HearingSessionId,
    CaseId,
    UserId,
    Category,
    Reason,
    DocumentUrl,
    Status,
    ReviewedBy,
    ReviewedAt,
    ReviewComment,
    NotificationSent,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Attendance {
    Table,
    Id,
}
