use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;

use crate::container::testing::{TestContainer, TestContainerGuard};
use crate::database::{DatabaseConfig, DbConnection};
use crate::error::FrameworkError;

/// Fresh in-memory SQLite database for one test
///
/// Runs the migrator and binds the connection in this thread's test
/// container, so `DB::connection()` resolves to it until the value drops.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn lists_hostels() {
///     let db = TestDatabase::fresh::<Migrator>().await.unwrap();
///     // ...
/// }
/// ```
pub struct TestDatabase {
    conn: DbConnection,
    _container: TestContainerGuard,
}

impl TestDatabase {
    pub async fn fresh<M: MigratorTrait>() -> Result<Self, FrameworkError> {
        // One pooled connection: every in-memory SQLite connection is its own database
        let config = DatabaseConfig::builder()
            .url("sqlite::memory:")
            .max_connections(1)
            .min_connections(1)
            .logging(false)
            .build();
        let conn = DbConnection::connect(&config).await?;
        M::up(conn.inner(), None).await?;

        let guard = TestContainer::fake();
        TestContainer::singleton(conn.clone());
        Ok(Self {
            conn,
            _container: guard,
        })
    }

    pub fn conn(&self) -> &DatabaseConnection {
        self.conn.inner()
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.inner()
    }
}
