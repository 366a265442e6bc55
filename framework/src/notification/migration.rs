use sea_orm_migration::prelude::*;

/// Creates the `notifications` table; add it to the application's migrator
pub struct CreateNotificationsTable;

impl MigrationName for CreateNotificationsTable {
    fn name(&self) -> &str {
        "m20240101_000002_create_notifications_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateNotificationsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string().not_null())
                    .col(ColumnDef::new(Notifications::Data).text().not_null())
                    .col(ColumnDef::new(Notifications::ReadAt).timestamp().null())
                    .col(ColumnDef::new(Notifications::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Notifications::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_read")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::ReadAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Kind,
    Data,
    ReadAt,
    CreatedAt,
    UpdatedAt,
}
