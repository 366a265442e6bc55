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
                        .table(Hostels::Table)
                        .if_not_exists()
                        .col(id(Hostels::Id))
                        .col(foreign(Hostels::SchoolId))
                        .col(string(Hostels::Name))
                        .col(string(Hostels::Kind))
                        .col(integer(Hostels::Capacity))
                        .col(string_null(Hostels::WardenName)),
                    true,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Notices::Table)
                        .if_not_exists()
                        .col(id(Notices::Id))
                        .col(foreign(Notices::SchoolId))
                        .col(foreign(Notices::CreatedBy))
                        .col(string(Notices::Title))
                        .col(ColumnDef::new(Notices::Body).text().not_null())
                        .col(string(Notices::Audience))
                        .col(timestamp_null(Notices::PublishedAt)),
                    true,
                )
                .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Hostels::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Hostels {
    Table,
    Id,
    SchoolId,
    Name,
    Kind,
    Capacity,
    WardenName,
}

#[derive(DeriveIden)]
enum Notices {
    Table,
    Id,
    SchoolId,
    CreatedBy,
    Title,
    Body,
    Audience,
    PublishedAt,
}
