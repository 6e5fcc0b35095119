//! Create witness table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Witness::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Witness::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Witness::CaseId).string_len(32).not_null())
                    .col(ColumnDef::new(Witness::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Witness::Address).text())
                    .col(
                        ColumnDef::new(Witness::StatementRecorded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Witness::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_witness_case")
                            .from(Witness::Table, Witness::CaseId)
                            .to(CourtCase::Table, CourtCase::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_witness_user")
                            .from(Witness::Table, Witness::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: a user is attached to a case at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_witness_case_user")
                    .table(Witness::Table)
                    .col(Witness::CaseId)
                    .col(Witness::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_witness_user_id")
                    .table(Witness::Table)
                    .col(Witness::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Witness::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Witness {
    Table,
    Id,
    CaseId,
    UserId,
    Address,
    StatementRecorded,
    CreatedAt,
}

#[derive(Iden)]
enum CourtCase {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
