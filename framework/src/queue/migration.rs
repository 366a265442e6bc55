use sea_orm_migration::prelude::*;

/// Creates the `jobs` table; add it to the application's migrator
pub struct CreateJobsTable;

impl MigrationName for CreateJobsTable {
    fn name(&self) -> &str {
        "m20240101_000001_create_jobs_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateJobsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Jobs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Jobs::Queue).string().not_null())
                    .col(ColumnDef::new(Jobs::Name).string().not_null())
                    .col(ColumnDef::new(Jobs::Payload).text().not_null())
                    .col(ColumnDef::new(Jobs::Status).string().not_null())
                    .col(ColumnDef::new(Jobs::Attempts).integer().not_null().default(0))
                    .col(ColumnDef::new(Jobs::MaxAttempts).integer().not_null())
                    .col(ColumnDef::new(Jobs::Error).text().null())
                    .col(ColumnDef::new(Jobs::AvailableAt).timestamp().not_null())
                    .col(ColumnDef::new(Jobs::ReservedUntil).timestamp().null())
                    .col(ColumnDef::new(Jobs::WorkerId).string().null())
                    .col(ColumnDef::new(Jobs::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Jobs::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Jobs::CompletedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_queue_status_available")
                    .table(Jobs::Table)
                    .col(Jobs::Queue)
                    .col(Jobs::Status)
                    .col(Jobs::AvailableAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    Queue,
    Name,
    Payload,
    Status,
    Attempts,
    MaxAttempts,
    Error,
    AvailableAt,
    ReservedUntil,
    WorkerId,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
