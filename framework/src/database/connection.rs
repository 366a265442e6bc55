use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::database::config::DatabaseConfig;
use crate::error::FrameworkError;

/// Clonable handle to the SeaORM connection pool
///
/// Stored in the container by `DB::init` and dereferences to
/// `DatabaseConnection`, so it can be passed straight to SeaORM calls.
#[derive(Clone)]
pub struct DbConnection {
    inner: Arc<DatabaseConnection>,
}

impl DbConnection {
    /// Open a pool; file-backed SQLite databases are created on demand
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, FrameworkError> {
        let url = normalize_sqlite_url(&config.url);

        let mut opt = ConnectOptions::new(&url);
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .sqlx_logging(config.logging);

        let conn = Database::connect(opt)
            .await
            .map_err(|e| FrameworkError::database(e.to_string()))?;
        tracing::debug!(backend = ?config.database_type(), "database connected");

        Ok(Self {
            inner: Arc::new(conn),
        })
    }

    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }
}

/// `sqlite://path` becomes `sqlite:path?mode=rwc` with parent dirs created
fn normalize_sqlite_url(url: &str) -> String {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return url.to_string();
    };
    let path = path.trim_start_matches("./");
    if path.starts_with(":memory:") {
        return format!("sqlite:{}", path);
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!(path, error = %err, "could not create database directory");
            }
        }
    }
    format!("sqlite:{}?mode=rwc", path)
}

impl AsRef<DatabaseConnection> for DbConnection {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.inner
    }
}

impl std::ops::Deref for DbConnection {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
