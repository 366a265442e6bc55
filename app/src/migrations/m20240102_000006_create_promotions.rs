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
                        .table(PromotionBatches::Table)
                        .if_not_exists()
                        .col(id(PromotionBatches::Id))
                        .col(foreign(PromotionBatches::SchoolId))
                        .col(foreign(PromotionBatches::FromSessionId))
                        .col(foreign(PromotionBatches::ToSessionId))
                        .col(foreign(PromotionBatches::FromClassSectionId))
                        .col(foreign(PromotionBatches::ToClassSectionId))
                        .col(string(PromotionBatches::Status))
                        .col(foreign(PromotionBatches::CreatedBy))
                        .col(foreign_null(PromotionBatches::ReviewedBy))
                        .col(string_null(PromotionBatches::RejectionReason))
                        .col(foreign_null(PromotionBatches::JobId))
                        .col(ColumnDef::new(PromotionBatches::PromotedCount).integer().not_null().default(0))
                        .col(ColumnDef::new(PromotionBatches::FailureReason).text().null()),
                    false,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(PromotionBatchItems::Table)
                        .if_not_exists()
                        .col(id(PromotionBatchItems::Id))
                        .col(foreign(PromotionBatchItems::BatchId))
                        .col(foreign(PromotionBatchItems::StudentId))
                        .col(string(PromotionBatchItems::Status)),
                    false,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(
                index(
                    "idx_promotion_items_batch_student",
                    PromotionBatchItems::Table,
                    &["batch_id", "student_id"],
                )
                .unique()
                .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PromotionBatchItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PromotionBatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PromotionBatches {
    Table,
    Id,
    SchoolId,
    FromSessionId,
    ToSessionId,
    FromClassSectionId,
    ToClassSectionId,
    Status,
    CreatedBy,
    ReviewedBy,
    RejectionReason,
    JobId,
    PromotedCount,
    FailureReason,
}

#[derive(DeriveIden)]
enum PromotionBatchItems {
    Table,
    Id,
    BatchId,
    StudentId,
    Status,
}
