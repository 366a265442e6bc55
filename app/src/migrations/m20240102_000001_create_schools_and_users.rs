use super::columns::*;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Schools::Table)
                        .if_not_exists()
                        .col(id(Schools::Id))
                        .col(string(Schools::Name))
                        .col(string(Schools::Code).unique_key()),
                    false,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(id(Users::Id))
                        .col(foreign(Users::SchoolId))
                        .col(string(Users::Name))
                        .col(string(Users::Email).unique_key())
                        .col(string(Users::Password))
                        .col(string(Users::Role)),
                    false,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(index("idx_users_school", Users::Table, &["school_id"]))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApiTokens::Table)
                    .if_not_exists()
                    .col(id(ApiTokens::Id))
                    .col(foreign(ApiTokens::UserId))
                    .col(string(ApiTokens::TokenHash).unique_key())
                    .col(timestamp_null(ApiTokens::LastUsedAt))
                    .col(timestamp(ApiTokens::ExpiresAt))
                    .col(timestamp(ApiTokens::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Schools::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Schools {
    Table,
    Id,
    Name,
    Code,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    SchoolId,
    Name,
    Email,
    Password,
    Role,
}

#[derive(DeriveIden)]
enum ApiTokens {
    Table,
    Id,
    UserId,
    TokenHash,
    LastUsedAt,
    ExpiresAt,
    CreatedAt,
}
