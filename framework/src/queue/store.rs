//! Job persistence helpers
//!
//! State changes are conditional updates on the current status, so two
//! workers can never both claim or finish the same row.

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::database::DB;
use crate::error::FrameworkError;
use crate::queue::entity::jobs;
use crate::queue::types::{ClaimedJob, JobHandle, JobStatus};

pub async fn insert(
    queue: &str,
    name: &str,
    payload: &str,
    max_attempts: i32,
) -> Result<JobHandle, FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    let inserted = jobs::ActiveModel {
        queue: Set(queue.to_string()),
        name: Set(name.to_string()),
        payload: Set(payload.to_string()),
        status: Set(JobStatus::Pending.as_str().to_string()),
        attempts: Set(0),
        max_attempts: Set(max_attempts),
        error: Set(None),
        available_at: Set(now),
        reserved_until: Set(None),
        worker_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    Ok(JobHandle::new(inserted.id))
}

pub async fn find(id: i64) -> Result<jobs::Model, FrameworkError> {
    let db = DB::connection()?;
    jobs::Entity::find_by_id(id)
        .one(db.inner())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Job"))
}

/// Take the lease on one specific pending row
pub(crate) async fn claim(
    id: i64,
    worker_id: &str,
    lease: ChronoDuration,
) -> Result<Option<ClaimedJob>, FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    let result = jobs::Entity::update_many()
        .col_expr(jobs::Column::Status, Expr::value(JobStatus::Running.as_str()))
        .col_expr(jobs::Column::Attempts, Expr::col(jobs::Column::Attempts).add(1))
        .col_expr(jobs::Column::ReservedUntil, Expr::value(now + lease))
        .col_expr(jobs::Column::WorkerId, Expr::value(worker_id))
        .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
        .filter(jobs::Column::Id.eq(id))
        .filter(jobs::Column::Status.eq(JobStatus::Pending.as_str()))
        .exec(db.inner())
        .await?;
    if result.rows_affected != 1 {
        return Ok(None);
    }

    let record = find(id).await?;
    Ok(Some(ClaimedJob {
        id: record.id,
        name: record.name,
        payload: record.payload,
        attempts: record.attempts,
        max_attempts: record.max_attempts,
    }))
}

/// Candidates tried per claim before the worker idles
const CLAIM_CANDIDATES: u64 = 8;

/// Claim the oldest available job on `queue`
///
/// Candidates lost to another worker are skipped.
pub(crate) async fn claim_next(
    queue: &str,
    worker_id: &str,
    lease: ChronoDuration,
) -> Result<Option<ClaimedJob>, FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    let candidates = jobs::Entity::find()
        .filter(jobs::Column::Queue.eq(queue))
        .filter(jobs::Column::Status.eq(JobStatus::Pending.as_str()))
        .filter(jobs::Column::AvailableAt.lte(now))
        .order_by_asc(jobs::Column::Id)
        .limit(CLAIM_CANDIDATES)
        .all(db.inner())
        .await?;

    for candidate in candidates {
        if let Some(claimed) = claim(candidate.id, worker_id, lease).await? {
            return Ok(Some(claimed));
        }
    }
    Ok(None)
}

/// Return running jobs whose lease expired to the pending state
pub async fn release_expired() -> Result<u64, FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    let result = jobs::Entity::update_many()
        .col_expr(jobs::Column::Status, Expr::value(JobStatus::Pending.as_str()))
        .col_expr(jobs::Column::ReservedUntil, Expr::value(Option::<NaiveDateTime>::None))
        .col_expr(jobs::Column::WorkerId, Expr::value(Option::<String>::None))
        .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
        .filter(jobs::Column::Status.eq(JobStatus::Running.as_str()))
        .filter(jobs::Column::ReservedUntil.lt(now))
        .exec(db.inner())
        .await?;
    Ok(result.rows_affected)
}

pub(crate) async fn mark_completed(id: i64) -> Result<(), FrameworkError> {
    finish(id, JobStatus::Completed, None).await
}

pub(crate) async fn mark_failed(id: i64, error: &str) -> Result<(), FrameworkError> {
    finish(id, JobStatus::Failed, Some(error)).await
}

async fn finish(id: i64, status: JobStatus, error: Option<&str>) -> Result<(), FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    jobs::Entity::update_many()
        .col_expr(jobs::Column::Status, Expr::value(status.as_str()))
        .col_expr(jobs::Column::Error, Expr::value(error.map(str::to_string)))
        .col_expr(jobs::Column::CompletedAt, Expr::value(now))
        .col_expr(jobs::Column::ReservedUntil, Expr::value(Option::<NaiveDateTime>::None))
        .col_expr(jobs::Column::WorkerId, Expr::value(Option::<String>::None))
        .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
        .filter(jobs::Column::Id.eq(id))
        .filter(jobs::Column::Status.eq(JobStatus::Running.as_str()))
        .exec(db.inner())
        .await?;
    Ok(())
}

/// Put a failed attempt back on the queue after `delay`
pub(crate) async fn requeue(id: i64, error: &str, delay: ChronoDuration) -> Result<(), FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    jobs::Entity::update_many()
        .col_expr(jobs::Column::Status, Expr::value(JobStatus::Pending.as_str()))
        .col_expr(jobs::Column::Error, Expr::value(error))
        .col_expr(jobs::Column::AvailableAt, Expr::value(now + delay))
        .col_expr(jobs::Column::ReservedUntil, Expr::value(Option::<NaiveDateTime>::None))
        .col_expr(jobs::Column::WorkerId, Expr::value(Option::<String>::None))
        .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
        .filter(jobs::Column::Id.eq(id))
        .filter(jobs::Column::Status.eq(JobStatus::Running.as_str()))
        .exec(db.inner())
        .await?;
    Ok(())
}

/// Reset a failed job so workers pick it up again
pub async fn retry(id: i64) -> Result<(), FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();
    find(id).await?;

    let result = jobs::Entity::update_many()
        .col_expr(jobs::Column::Status, Expr::value(JobStatus::Pending.as_str()))
        .col_expr(jobs::Column::Attempts, Expr::value(0))
        .col_expr(jobs::Column::Error, Expr::value(Option::<String>::None))
        .col_expr(jobs::Column::AvailableAt, Expr::value(now))
        .col_expr(jobs::Column::CompletedAt, Expr::value(Option::<NaiveDateTime>::None))
        .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
        .filter(jobs::Column::Id.eq(id))
        .filter(jobs::Column::Status.eq(JobStatus::Failed.as_str()))
        .exec(db.inner())
        .await?;
    if result.rows_affected == 0 {
        return Err(FrameworkError::conflict("Only failed jobs can be retried."));
    }
    Ok(())
}
