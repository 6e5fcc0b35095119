//! Create attendance table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Attendance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attendance::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Attendance::HearingSessionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attendance::CaseId).string_len(32).not_null())
                    .col(ColumnDef::new(Attendance::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Attendance::AttendeeRole)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attendance::HearingDate).date().not_null())
                    .col(
                        ColumnDef::new(Attendance::Status)
                            .string_len(16)
                            .not_null()
                            .default("not_marked"),
                    )
                    .col(ColumnDef::new(Attendance::MarkedMethod).string_len(16))
                    .col(ColumnDef::new(Attendance::MarkedBy).string_len(32))
                    .col(ColumnDef::new(Attendance::ArrivalTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Attendance::QrScannedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Attendance::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Attendance::VerifiedBy).string_len(32))
                    .col(ColumnDef::new(Attendance::Remarks).text())
                    .col(
                        ColumnDef::new(Attendance::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Attendance::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_hearing_session")
                            .from(Attendance::Table, Attendance::HearingSessionId)
                            .to(HearingSession::Table, HearingSession::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_user")
                            .from(Attendance::Table, Attendance::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one record per (hearing session, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_session_user")
                    .table(Attendance::Table)
                    .col(Attendance::HearingSessionId)
                    .col(Attendance::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, status, hearing_date) for rolling absence counts
        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_user_status_date")
                    .table(Attendance::Table)
                    .col(Attendance::UserId)
                    .col(Attendance::Status)
                    .col(Attendance::HearingDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attendance::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Attendance {
    Table,
    Id,
    HearingSessionId,
    CaseId,
    UserId,
    AttendeeRole,
    HearingDate,
    Status,
    MarkedMethod,
    MarkedBy,
    ArrivalTime,
    QrScannedAt,
    IsVerified,
    VerifiedBy,
    Remarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum HearingSession {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
