use crate::config::env;

/// Database backend inferred from the connection URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Postgres,
    Sqlite,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("sqlite") {
            DatabaseType::Sqlite
        } else {
            DatabaseType::Postgres
        }
    }
}

/// Database connection settings
///
/// # Environment Variables
///
/// - `DATABASE_URL` - connection URL (default: `sqlite://./database.db`)
/// - `DB_MAX_CONNECTIONS` - pool ceiling (default: 10)
/// - `DB_MIN_CONNECTIONS` - idle connections kept open (default: 1)
/// - `DB_CONNECT_TIMEOUT` - seconds (default: 30)
/// - `DB_LOGGING` - log every statement through sqlx (default: false)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub logging: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env("DATABASE_URL", "sqlite://./database.db".to_string()),
            max_connections: env("DB_MAX_CONNECTIONS", 10),
            min_connections: env("DB_MIN_CONNECTIONS", 1),
            connect_timeout: env("DB_CONNECT_TIMEOUT", 30),
            logging: env("DB_LOGGING", false),
        }
    }

    pub fn builder() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::default()
    }

    pub fn database_type(&self) -> DatabaseType {
        DatabaseType::from_url(&self.url)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Builder for DatabaseConfig; unset fields come from the environment
#[derive(Default)]
pub struct DatabaseConfigBuilder {
    url: Option<String>,
    max_connections: Option<u32>,
    min_connections: Option<u32>,
    connect_timeout: Option<u64>,
    logging: Option<bool>,
}

impl DatabaseConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = Some(n);
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = Some(n);
        self
    }

    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = Some(secs);
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = Some(enabled);
        self
    }

    pub fn build(self) -> DatabaseConfig {
        let default = DatabaseConfig::from_env();
        DatabaseConfig {
            url: self.url.unwrap_or(default.url),
            max_connections: self.max_connections.unwrap_or(default.max_connections),
            min_connections: self.min_connections.unwrap_or(default.min_connections),
            connect_timeout: self.connect_timeout.unwrap_or(default.connect_timeout),
            logging: self.logging.unwrap_or(default.logging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_backend_from_url() {
        let config = DatabaseConfig::builder().url("sqlite::memory:").build();
        assert_eq!(config.database_type(), DatabaseType::Sqlite);
        assert_eq!(
            DatabaseType::from_url("postgres://campus@localhost/campus"),
            DatabaseType::Postgres
        );
    }
}
