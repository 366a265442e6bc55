//! Tenant-scoped model access with soft deletes
//!
//! Entities opt in by implementing `Model` (reads) and `ModelMut`
//! (soft-delete lifecycle):
//!
//! ```rust,ignore
//! impl campus::database::Model for Entity {
//!     const LABEL: &'static str = "Hostel";
//!     fn key_column() -> Column { Column::Id }
//!     fn tenant_column() -> Option<Column> { Some(Column::SchoolId) }
//!     fn deleted_at_column() -> Option<Column> { Some(Column::DeletedAt) }
//! }
//! impl campus::database::ModelMut for Entity {}
//! ```

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Select};

use crate::error::FrameworkError;

/// Which rows a query sees with respect to soft deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trashed {
    #[default]
    Without,
    With,
    Only,
}

#[async_trait]
pub trait Model: EntityTrait {
    /// Name used in "not found" messages
    const LABEL: &'static str;

    fn key_column() -> Self::Column;

    fn tenant_column() -> Option<Self::Column> {
        None
    }

    fn deleted_at_column() -> Option<Self::Column> {
        None
    }

    /// Rows belonging to one school
    fn scoped(school_id: i64) -> Select<Self> {
        match Self::tenant_column() {
            Some(col) => Self::find().filter(col.eq(school_id)),
            None => Self::find(),
        }
    }

    /// Rows of one school, trashed rows included or excluded as asked
    fn query(school_id: i64, trashed: Trashed) -> Select<Self> {
        let select = Self::scoped(school_id);
        match (Self::deleted_at_column(), trashed) {
            (Some(col), Trashed::Without) => select.filter(col.is_null()),
            (Some(col), Trashed::Only) => select.filter(col.is_not_null()),
            _ => select,
        }
    }

    /// Live row by key; missing, trashed and foreign rows are all 404
    async fn find_scoped<C>(db: &C, school_id: i64, id: i64) -> Result<Self::Model, FrameworkError>
    where
        C: ConnectionTrait,
    {
        Self::find_with(db, school_id, id, Trashed::Without).await
    }

    async fn find_scoped_with_trashed<C>(
        db: &C,
        school_id: i64,
        id: i64,
    ) -> Result<Self::Model, FrameworkError>
    where
        C: ConnectionTrait,
    {
        Self::find_with(db, school_id, id, Trashed::With).await
    }

    async fn find_with<C>(
        db: &C,
        school_id: i64,
        id: i64,
        trashed: Trashed,
    ) -> Result<Self::Model, FrameworkError>
    where
        C: ConnectionTrait,
    {
        Self::query(school_id, trashed)
            .filter(Self::key_column().eq(id))
            .one(db)
            .await?
            .ok_or_else(|| FrameworkError::model_not_found(Self::LABEL))
    }
}

/// Soft delete, restore and force delete by key
///
/// Each operation is a single conditional statement, so a row changed by a
/// concurrent request is reported instead of silently overwritten.
#[async_trait]
pub trait ModelMut: Model {
    /// Set `deleted_at`; a row that is already trashed is 404
    async fn soft_delete<C>(db: &C, school_id: i64, id: i64) -> Result<(), FrameworkError>
    where
        C: ConnectionTrait,
    {
        let deleted_at = soft_delete_column::<Self>()?;
        let update = Self::update_many()
            .col_expr(deleted_at, Expr::value(Utc::now().naive_utc()))
            .filter(Self::key_column().eq(id))
            .filter(deleted_at.is_null());
        let result = for_tenant::<Self, _>(update, school_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(FrameworkError::model_not_found(Self::LABEL));
        }
        Ok(())
    }

    /// Clear `deleted_at`; restoring a live row is a 409
    async fn restore<C>(db: &C, school_id: i64, id: i64) -> Result<Self::Model, FrameworkError>
    where
        C: ConnectionTrait,
    {
        let deleted_at = soft_delete_column::<Self>()?;
        Self::find_scoped_with_trashed(db, school_id, id).await?;

        let update = Self::update_many()
            .col_expr(deleted_at, Expr::value(Option::<NaiveDateTime>::None))
            .filter(Self::key_column().eq(id))
            .filter(deleted_at.is_not_null());
        let result = for_tenant::<Self, _>(update, school_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(FrameworkError::conflict(format!(
                "{} is not deleted.",
                Self::LABEL
            )));
        }
        Self::find_scoped(db, school_id, id).await
    }

    /// Permanently remove a row; only trashed rows may be removed
    async fn force_delete<C>(db: &C, school_id: i64, id: i64) -> Result<(), FrameworkError>
    where
        C: ConnectionTrait,
    {
        let deleted_at = soft_delete_column::<Self>()?;
        Self::find_scoped_with_trashed(db, school_id, id).await?;

        let delete = Self::delete_many()
            .filter(Self::key_column().eq(id))
            .filter(deleted_at.is_not_null());
        let result = for_tenant::<Self, _>(delete, school_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(FrameworkError::conflict(format!(
                "{} must be deleted before it can be permanently removed.",
                Self::LABEL
            )));
        }
        Ok(())
    }
}

fn soft_delete_column<M: Model>() -> Result<M::Column, FrameworkError> {
    M::deleted_at_column().ok_or_else(|| {
        FrameworkError::internal(format!("{} does not use soft deletes", M::LABEL))
    })
}

fn for_tenant<M: Model, Q: QueryFilter>(query: Q, school_id: i64) -> Q {
    match M::tenant_column() {
        Some(col) => query.filter(col.eq(school_id)),
        None => query,
    }
}
