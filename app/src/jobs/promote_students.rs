use campus::database::Model;
use campus::notification::{self, Notification};
use campus::queue::Job;
use campus::{async_trait, FrameworkError, DB};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::models::promotion_batches::{self, BatchStatus};
use crate::models::{academic_sessions, class_sections, now, promotion_batch_items as items, students, users};
use crate::notifications::PromotionFinished;

/// Move every pending student of an approved batch to its destination
///
/// Each student moves in its own transaction together with its item, so a
/// retry picks up where the last attempt stopped.
#[derive(Debug, Serialize, Deserialize)]
pub struct PromoteStudents {
    pub school_id: i64,
    pub batch_id: i64,
}

#[async_trait]
impl Job for PromoteStudents {
    const NAME: &'static str = "promote_students";

    async fn handle(&self) -> Result<(), FrameworkError> {
        let db = DB::connection()?;
        let db = db.inner();
        let batch = promotion_batches::Entity::find_scoped(db, self.school_id, self.batch_id).await?;
        if batch.status != BatchStatus::Processing.as_str() {
            tracing::warn!(batch_id = batch.id, status = %batch.status, "batch is not processing, skipping");
            return Ok(());
        }

        class_sections::Entity::find_scoped(db, self.school_id, batch.to_class_section_id).await?;
        academic_sessions::Entity::find_scoped(db, self.school_id, batch.to_session_id).await?;

        let pending = items::Entity::find()
            .filter(items::Column::BatchId.eq(batch.id))
            .filter(items::Column::Status.eq(items::STATUS_PENDING))
            .order_by_asc(items::Column::Id)
            .all(db)
            .await?;
        for item in &pending {
            self.promote(db, &batch, item).await?;
        }

        let promoted = items::Entity::find()
            .filter(items::Column::BatchId.eq(batch.id))
            .filter(items::Column::Status.eq(items::STATUS_PROMOTED))
            .count(db)
            .await?;
        let promoted = i32::try_from(promoted).map_err(|e| FrameworkError::internal(e.to_string()))?;

        let finished = self
            .finish(
                db,
                vec![
                    (promotion_batches::Column::Status, Expr::value(BatchStatus::Completed.as_str())),
                    (promotion_batches::Column::PromotedCount, Expr::value(promoted)),
                ],
            )
            .await?;
        if finished {
            tracing::info!(batch_id = batch.id, promoted, "promotion batch completed");
            notify_creator(&batch, &PromotionFinished::completed(batch.id, promoted)).await;
        }
        Ok(())
    }

    async fn failed(&self, error: &str) -> Result<(), FrameworkError> {
        let db = DB::connection()?;
        let db = db.inner();
        let finished = self
            .finish(
                db,
                vec![
                    (promotion_batches::Column::Status, Expr::value(BatchStatus::Failed.as_str())),
                    (promotion_batches::Column::FailureReason, Expr::value(error)),
                ],
            )
            .await?;
        if finished {
            tracing::error!(batch_id = self.batch_id, error, "promotion batch failed");
            let batch = promotion_batches::Entity::find_scoped(db, self.school_id, self.batch_id).await?;
            notify_creator(&batch, &PromotionFinished::failed(batch.id, error)).await;
        }
        Ok(())
    }
}

impl PromoteStudents {
    async fn promote(
        &self,
        db: &DatabaseConnection,
        batch: &promotion_batches::Model,
        item: &items::Model,
    ) -> Result<(), FrameworkError> {
        let txn = db.begin().await?;
        let now = now();

        let moved = students::Entity::update_many()
            .col_expr(students::Column::ClassSectionId, Expr::value(batch.to_class_section_id))
            .col_expr(students::Column::AcademicSessionId, Expr::value(batch.to_session_id))
            .col_expr(students::Column::UpdatedAt, Expr::value(now))
            .filter(students::Column::Id.eq(item.student_id))
            .filter(students::Column::SchoolId.eq(self.school_id))
            .filter(students::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?
            .rows_affected;

        let status = if moved == 1 { items::STATUS_PROMOTED } else { items::STATUS_SKIPPED };
        if moved == 0 {
            tracing::warn!(batch_id = batch.id, student_id = item.student_id, "student gone, skipping");
        }
        items::Entity::update_many()
            .col_expr(items::Column::Status, Expr::value(status))
            .col_expr(items::Column::UpdatedAt, Expr::value(now))
            .filter(items::Column::Id.eq(item.id))
            .filter(items::Column::Status.eq(items::STATUS_PENDING))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Leave `processing`; false when another run already did
    async fn finish<C: ConnectionTrait>(
        &self,
        db: &C,
        changes: Vec<(promotion_batches::Column, sea_orm::sea_query::SimpleExpr)>,
    ) -> Result<bool, FrameworkError> {
        let mut update = promotion_batches::Entity::update_many()
            .col_expr(promotion_batches::Column::UpdatedAt, Expr::value(now()));
        for (column, value) in changes {
            update = update.col_expr(column, value);
        }
        let result = update
            .filter(promotion_batches::Column::Id.eq(self.batch_id))
            .filter(promotion_batches::Column::SchoolId.eq(self.school_id))
            .filter(promotion_batches::Column::Status.eq(BatchStatus::Processing.as_str()))
            .exec(db)
            .await?;
        Ok(result.rows_affected == 1)
    }
}

async fn notify_creator(batch: &promotion_batches::Model, notification: &dyn Notification) {
    let creator = match DB::connection() {
        Ok(db) => users::Entity::find_by_id(batch.created_by).one(db.inner()).await,
        Err(err) => {
            tracing::error!(batch_id = batch.id, error = %err, "could not notify batch creator");
            return;
        }
    };
    match creator {
        Ok(Some(user)) => {
            if let Err(err) = notification::send(&user.notifiable(), notification).await {
                tracing::error!(batch_id = batch.id, error = %err, "could not notify batch creator");
            }
        }
        Ok(None) => tracing::warn!(batch_id = batch.id, "batch creator no longer exists"),
        Err(err) => tracing::error!(batch_id = batch.id, error = %err, "could not notify batch creator"),
    }
}
