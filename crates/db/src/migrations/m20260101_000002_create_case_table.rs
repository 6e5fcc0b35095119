//! Create court case table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CourtCase::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourtCase::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CourtCase::FirNumber)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CourtCase::Title).string_len(256).not_null())
                    .col(ColumnDef::new(CourtCase::Description).text())
                    .col(
                        ColumnDef::new(CourtCase::PoliceStation)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CourtCase::CourtName).string_len(128).not_null())
                    .col(ColumnDef::new(CourtCase::Sections).string_len(256))
                    .col(
                        ColumnDef::new(CourtCase::InvestigatingOfficerId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CourtCase::LiaisonOfficerId).string_len(32))
                    .col(
                        ColumnDef::new(CourtCase::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(CourtCase::AttendanceStatus).string_len(16))
                    .col(ColumnDef::new(CourtCase::NextHearingDate).date())
                    .col(ColumnDef::new(CourtCase::NextHearingTime).string_len(5))
                    .col(ColumnDef::new(CourtCase::CreatedBy).string_len(32).not_null())
                    .col(
                        ColumnDef::new(CourtCase::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(CourtCase::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_court_case_investigating_officer")
                            .from(CourtCase::Table, CourtCase::InvestigatingOfficerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_court_case_liaison_officer")
                            .from(CourtCase::Table, CourtCase::LiaisonOfficerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_court_case_investigating_officer_id")
                    .table(CourtCase::Table)
                    .col(CourtCase::InvestigatingOfficerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_court_case_status")
                    .table(CourtCase::Table)
                    .col(CourtCase::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CourtCase::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CourtCase {
    Table,
    Id,
    FirNumber,
    Title,
    Description,
    PoliceStation,
    CourtName,
    Sections,
    InvestigatingOfficerId,
    LiaisonOfficerId,
    Status,
    AttendanceStatus,
    NextHearingDate,
    NextHearingTime,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
