//! "Only one current row" flags
//!
//! Academic sessions and terms have one current row per school, timetables
//! one active row per class section. The switch is two conditional updates
//! run inside the caller's transaction: demote every other flagged row in
//! the scope, then flag the target.
//!
//! Under READ COMMITTED two transactions cannot see each other's freshly
//! flagged rows, so a flag declared with `locking` first takes `FOR UPDATE`
//! on the row that owns the scope (the school, the class section). Switches
//! in one scope then run one after another. SQLite has no row locks and
//! already serialises writers.

use sea_orm::sea_query::{Expr, LockType, Query, SelectStatement};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};

use crate::error::FrameworkError;

pub struct ExclusiveFlag<E: EntityTrait> {
    flag: E::Column,
    key: E::Column,
    scope: Condition,
    owner: Option<SelectStatement>,
}

impl<E: EntityTrait> ExclusiveFlag<E> {
    /// `scope` selects the rows that compete for the flag
    pub fn new(flag: E::Column, key: E::Column, scope: Condition) -> Self {
        Self {
            flag,
            key,
            scope,
            owner: None,
        }
    }

    /// Serialise switches on the `owner_id` row of `P`
    pub fn locking<P: EntityTrait>(mut self, owner_key: P::Column, owner_id: i64) -> Self {
        let mut select = Query::select();
        select
            .column((P::default(), owner_key))
            .from(P::default())
            .and_where(Expr::col((P::default(), owner_key)).eq(owner_id))
            .lock(LockType::Update);
        self.owner = Some(select);
        self
    }

    async fn lock_owner<C>(&self, db: &C) -> Result<(), FrameworkError>
    where
        C: ConnectionTrait,
    {
        if let Some(select) = &self.owner {
            db.query_one(db.get_database_backend().build(select)).await?;
        }
        Ok(())
    }

    /// Clear the flag on every row in scope except `keep`
    pub async fn demote_others<C>(&self, db: &C, keep: i64) -> Result<u64, FrameworkError>
    where
        C: ConnectionTrait,
    {
        self.lock_owner(db).await?;
        let result = E::update_many()
            .col_expr(self.flag, Expr::value(false))
            .filter(self.scope.clone())
            .filter(self.flag.eq(true))
            .filter(self.key.ne(keep))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Make `id` the only flagged row in scope; 404 when it is out of scope
    pub async fn promote<C>(&self, db: &C, id: i64) -> Result<(), FrameworkError>
    where
        C: ConnectionTrait,
    {
        let demoted = self.demote_others(db, id).await?;
        let result = E::update_many()
            .col_expr(self.flag, Expr::value(true))
            .filter(self.scope.clone())
            .filter(self.key.eq(id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(FrameworkError::model_not_found("Record"));
        }
        tracing::debug!(id, demoted, "flag switched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::fixtures::{building, buildings, room, rooms, FixtureMigrator};
    use crate::testing::TestDatabase;
    use sea_orm::TransactionTrait;

    fn flag(school_id: i64) -> ExclusiveFlag<rooms::Entity> {
        ExclusiveFlag::new(
            rooms::Column::IsCurrent,
            rooms::Column::Id,
            Condition::all().add(rooms::Column::SchoolId.eq(school_id)),
        )
    }

    async fn current_ids(db: &sea_orm::DatabaseConnection) -> Vec<i64> {
        rooms::Entity::find()
            .filter(rooms::Column::IsCurrent.eq(true))
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    #[tokio::test]
    async fn promoting_demotes_the_rest_of_the_scope() {
        let db = TestDatabase::fresh::<FixtureMigrator>().await.unwrap();
        let a = room(&db, 1, None, "A", 10).await;
        let b = room(&db, 1, None, "B", 10).await;
        let other_school = room(&db, 2, None, "C", 10).await;

        flag(1).promote(db.conn(), a.id).await.unwrap();
        flag(2).promote(db.conn(), other_school.id).await.unwrap();

        let txn = db.conn().begin().await.unwrap();
        flag(1).promote(&txn, b.id).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(current_ids(&db).await, vec![b.id, other_school.id]);
    }

    #[tokio::test]
    async fn locking_flags_take_the_owner_row_first() {
        let db = TestDatabase::fresh::<FixtureMigrator>().await.unwrap();
        let owner = building(&db, "Main").await;
        let a = room(&db, 1, Some(owner.id), "A", 10).await;
        let b = room(&db, 1, Some(owner.id), "B", 10).await;
        let locking = || flag(1).locking::<buildings::Entity>(buildings::Column::Id, owner.id);

        let sql = locking()
            .owner
            .map(|select| select.to_string(sea_orm::sea_query::PostgresQueryBuilder))
            .unwrap();
        assert!(sql.ends_with("FOR UPDATE"), "{}", sql);
        assert!(sql.contains(&format!("\"buildings\".\"id\" = {}", owner.id)), "{}", sql);

        let txn = db.conn().begin().await.unwrap();
        locking().promote(&txn, a.id).await.unwrap();
        locking().promote(&txn, b.id).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(current_ids(&db).await, vec![b.id]);
    }

    #[tokio::test]
    async fn promoting_outside_scope_is_not_found() {
        let db = TestDatabase::fresh::<FixtureMigrator>().await.unwrap();
        let a = room(&db, 1, None, "A", 10).await;

        let err = flag(2).promote(db.conn(), a.id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
