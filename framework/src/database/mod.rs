//! Database access
//!
//! SeaORM connection pool held in the service container, tenant-scoped
//! model traits with soft deletes, and the "only one current row" flag.
//!
//! ```rust,ignore
//! use campus::{Config, DatabaseConfig, DB};
//!
//! Config::register(DatabaseConfig::from_env());
//! DB::init().await?;
//!
//! let conn = DB::connection()?;
//! let hostels = hostels::Entity::query(school_id, Trashed::Without).all(conn.inner()).await?;
//! ```

pub mod config;
pub mod connection;
pub mod current;
pub mod model;
pub mod testing;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::{DatabaseConfig, DatabaseConfigBuilder, DatabaseType};
pub use connection::DbConnection;
pub use current::ExclusiveFlag;
pub use model::{Model, ModelMut, Trashed};

use crate::error::FrameworkError;
use crate::{App, Config};

/// Database facade
pub struct DB;

impl DB {
    /// Connect using the registered `DatabaseConfig` (or the environment)
    pub async fn init() -> Result<(), FrameworkError> {
        let config = Config::get::<DatabaseConfig>().unwrap_or_else(DatabaseConfig::from_env);
        Self::init_with(config).await
    }

    pub async fn init_with(config: DatabaseConfig) -> Result<(), FrameworkError> {
        let connection = DbConnection::connect(&config).await?;
        App::singleton(connection);
        Ok(())
    }

    /// The shared connection; fails until `DB::init` ran
    pub fn connection() -> Result<DbConnection, FrameworkError> {
        App::resolve::<DbConnection>()
    }
}

pub use sea_orm;
