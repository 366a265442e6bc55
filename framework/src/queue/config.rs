use crate::config::env;

/// Where dispatched jobs run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueConnection {
    /// Inline, inside `dispatch`
    Sync,
    /// Stored in the `jobs` table and run by `queue:work`
    Database,
}

impl QueueConnection {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => QueueConnection::Database,
            _ => QueueConnection::Sync,
        }
    }
}

/// Queue configuration
///
/// # Environment Variables
///
/// - `QUEUE_CONNECTION` - `sync` or `database` (default: sync)
/// - `QUEUE_NAME` - queue claimed by workers (default: default)
/// - `QUEUE_POLL_INTERVAL_MS` - idle poll interval (default: 1000)
/// - `QUEUE_CONCURRENCY` - jobs run at once per worker (default: 4)
/// - `QUEUE_LOCK_TIMEOUT_SECS` - lease before a claimed job is released (default: 300)
/// - `QUEUE_MAX_ATTEMPTS` - attempts before a job fails (default: 3)
/// - `QUEUE_RETRY_BACKOFF_SECS` - linear backoff per attempt (default: 10)
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub connection: QueueConnection,
    pub queue: String,
    pub poll_interval_ms: u64,
    pub concurrency: usize,
    pub lock_timeout_secs: u64,
    pub max_attempts: i32,
    pub retry_backoff_secs: i64,
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            connection: QueueConnection::parse(&env("QUEUE_CONNECTION", "sync".to_string())),
            queue: env("QUEUE_NAME", "default".to_string()),
            poll_interval_ms: env("QUEUE_POLL_INTERVAL_MS", 1000u64),
            concurrency: env("QUEUE_CONCURRENCY", 4usize).max(1),
            lock_timeout_secs: env("QUEUE_LOCK_TIMEOUT_SECS", 300u64),
            max_attempts: env("QUEUE_MAX_ATTEMPTS", 3i32).max(1),
            retry_backoff_secs: env("QUEUE_RETRY_BACKOFF_SECS", 10i64),
        }
    }

    pub fn connection(mut self, connection: QueueConnection) -> Self {
        self.connection = connection;
        self
    }

    pub fn max_attempts(mut self, attempts: i32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn retry_backoff_secs(mut self, secs: i64) -> Self {
        self.retry_backoff_secs = secs;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
