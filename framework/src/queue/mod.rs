//! Database-backed job queue
//!
//! Jobs are serialized to JSON, stored in the `jobs` table and run by
//! `campus queue:work`. With `QUEUE_CONNECTION=sync` they run inline inside
//! `dispatch`.
//!
//! ```rust,ignore
//! use campus::queue::{dispatch, Job};
//! use campus::{async_trait, register_job, FrameworkError};
//!
//! #[derive(Serialize, Deserialize)]
//! pub struct SendReminder { pub user_id: i64 }
//!
//! #[async_trait]
//! impl Job for SendReminder {
//!     const NAME: &'static str = "send_reminder";
//!
//!     async fn handle(&self) -> Result<(), FrameworkError> {
//!         Ok(())
//!     }
//! }
//!
//! register_job!(SendReminder);
//!
//! dispatch(&SendReminder { user_id: 7 }).await?;
//! ```

pub mod config;
pub mod entity;
pub mod migration;
#[doc(hidden)]
pub mod registry;
pub mod store;
pub mod types;

pub use config::{QueueConfig, QueueConnection};
pub use migration::CreateJobsTable;
pub use registry::{JobEntry, JobFuture};
pub use types::{JobHandle, JobStatus};

use crate::config::Config;
use crate::error::FrameworkError;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use types::ClaimedJob;

#[async_trait]
pub trait Job: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name stored with the row; renaming it orphans queued jobs
    const NAME: &'static str;

    async fn handle(&self) -> Result<(), FrameworkError>;

    /// Called once after the final attempt failed
    async fn failed(&self, _error: &str) -> Result<(), FrameworkError> {
        Ok(())
    }
}

#[doc(hidden)]
pub fn run_job<J: Job>(payload: String) -> JobFuture {
    Box::pin(async move {
        let job: J = serde_json::from_str(&payload)?;
        job.handle().await
    })
}

#[doc(hidden)]
pub fn fail_job<J: Job>(payload: String, error: String) -> JobFuture {
    Box::pin(async move {
        let job: J = serde_json::from_str(&payload)?;
        job.failed(&error).await
    })
}

/// Make a job type runnable by workers
#[macro_export]
macro_rules! register_job {
    ($job:ty) => {
        $crate::inventory::submit! {
            $crate::queue::JobEntry {
                name: <$job as $crate::queue::Job>::NAME,
                run: $crate::queue::run_job::<$job>,
                fail: $crate::queue::fail_job::<$job>,
            }
        }
    };
}

/// Queue a job with the registered `QueueConfig`
pub async fn dispatch<J: Job>(job: &J) -> Result<JobHandle, FrameworkError> {
    let config = Config::get::<QueueConfig>().unwrap_or_else(QueueConfig::from_env);
    dispatch_with(job, &config).await
}

/// Queue a job; sync connections run it before returning
///
/// A failing inline job is recorded and its `failed` hook runs, but the
/// dispatcher still gets the handle.
pub async fn dispatch_with<J: Job>(job: &J, config: &QueueConfig) -> Result<JobHandle, FrameworkError> {
    let payload = serde_json::to_string(job)?;
    let handle = store::insert(&config.queue, J::NAME, &payload, config.max_attempts).await?;
    tracing::debug!(job = J::NAME, id = handle.id(), "job dispatched");

    if config.connection == QueueConnection::Sync {
        let lease = ChronoDuration::seconds(config.lock_timeout_secs as i64);
        if let Some(claimed) = store::claim(handle.id(), "sync", lease).await? {
            process_claimed_job(claimed, config, false).await?;
        }
    }
    Ok(handle)
}

/// Reset a failed job for another round of attempts
pub async fn retry(id: i64) -> Result<(), FrameworkError> {
    store::retry(id).await
}

/// Queue worker daemon
pub struct Worker {
    config: Arc<QueueConfig>,
    worker_id: String,
}

impl Worker {
    pub fn new() -> Self {
        let config = Config::get::<QueueConfig>().unwrap_or_else(QueueConfig::from_env);
        Self::with_config(config)
    }

    pub fn with_config(config: QueueConfig) -> Self {
        let random: u32 = rand::thread_rng().gen();
        Self {
            config: Arc::new(config),
            worker_id: format!("{}-{:08x}", std::process::id(), random),
        }
    }

    /// Claim and run jobs until the process is stopped
    ///
    /// Database errors while claiming are logged and retried after the poll
    /// interval.
    pub async fn run(self) -> Result<(), FrameworkError> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let lease = ChronoDuration::seconds(self.config.lock_timeout_secs as i64);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        tracing::info!(
            worker = %self.worker_id,
            queue = %self.config.queue,
            concurrency = self.config.concurrency,
            "queue worker started"
        );

        loop {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| FrameworkError::internal(e.to_string()))?;

            let claimed = match store::claim_next(&self.config.queue, &self.worker_id, lease).await {
                Ok(claimed) => claimed,
                Err(err) => {
                    drop(permit);
                    tracing::error!(worker = %self.worker_id, error = %err, "claiming a job failed");
                    tokio::time::sleep(poll).await;
                    continue;
                }
            };

            match claimed {
                Some(claimed) => {
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        let id = claimed.id;
                        if let Err(err) = process_claimed_job(claimed, &config, true).await {
                            tracing::error!(job_id = id, error = %err, "job bookkeeping failed");
                        }
                        drop(permit);
                    });
                }
                None => {
                    drop(permit);
                    match store::release_expired().await {
                        Ok(0) => {}
                        Ok(released) => tracing::warn!(released, "released jobs with expired leases"),
                        Err(err) => tracing::error!(error = %err, "releasing expired leases failed"),
                    }
                    tokio::time::sleep(poll).await;
                }
            }
        }
    }

    /// Claim and run at most one job, for tests and one-off runs
    pub async fn work_once(&self) -> Result<bool, FrameworkError> {
        let lease = ChronoDuration::seconds(self.config.lock_timeout_secs as i64);
        match store::claim_next(&self.config.queue, &self.worker_id, lease).await? {
            Some(claimed) => {
                process_claimed_job(claimed, &self.config, true).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

async fn process_claimed_job(
    claimed: ClaimedJob,
    config: &QueueConfig,
    allow_retry: bool,
) -> Result<(), FrameworkError> {
    let Some(entry) = registry::find(&claimed.name) else {
        tracing::error!(job = %claimed.name, id = claimed.id, "job is not registered");
        return store::mark_failed(claimed.id, "Job not registered").await;
    };

    tracing::info!(job = %claimed.name, id = claimed.id, attempt = claimed.attempts, "running job");
    let error = match (entry.run)(claimed.payload.clone()).await {
        Ok(()) => {
            tracing::info!(job = %claimed.name, id = claimed.id, "job completed");
            return store::mark_completed(claimed.id).await;
        }
        Err(err) => err.to_string(),
    };

    if allow_retry && claimed.attempts < claimed.max_attempts {
        let delay = ChronoDuration::seconds(config.retry_backoff_secs * claimed.attempts as i64);
        tracing::warn!(
            job = %claimed.name,
            id = claimed.id,
            attempt = claimed.attempts,
            error = %error,
            retry_in_secs = delay.num_seconds(),
            "job failed, retrying"
        );
        return store::requeue(claimed.id, &error, delay).await;
    }

    tracing::error!(job = %claimed.name, id = claimed.id, error = %error, "job failed");
    store::mark_failed(claimed.id, &error).await?;
    if let Err(hook_err) = (entry.fail)(claimed.payload, error).await {
        tracing::error!(job = %claimed.name, id = claimed.id, error = %hook_err, "failed hook errored");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDatabase;
    use sea_orm_migration::prelude::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RUNS: AtomicUsize = AtomicUsize::new(0);
    static FAILED_HOOKS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Serialize, Deserialize)]
    struct CountJob {
        fail_until: usize,
    }

    #[async_trait]
    impl Job for CountJob {
        const NAME: &'static str = "queue_tests::count";

        async fn handle(&self) -> Result<(), FrameworkError> {
            let run = RUNS.fetch_add(1, Ordering::SeqCst) + 1;
            if run <= self.fail_until {
                return Err(FrameworkError::internal(format!("attempt {} failed", run)));
            }
            Ok(())
        }

        async fn failed(&self, _error: &str) -> Result<(), FrameworkError> {
            FAILED_HOOKS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    register_job!(CountJob);

    struct QueueMigrator;

    #[async_trait::async_trait]
    impl MigratorTrait for QueueMigrator {
        fn migrations() -> Vec<Box<dyn MigrationTrait>> {
            vec![Box::new(CreateJobsTable)]
        }
    }

    fn database_config() -> QueueConfig {
        QueueConfig::from_env()
            .connection(QueueConnection::Database)
            .max_attempts(2)
            .retry_backoff_secs(0)
    }

    // One test drives all scenarios so the shared counters are not raced.
    #[tokio::test]
    async fn runs_retries_and_fails_jobs() {
        let _db = TestDatabase::fresh::<QueueMigrator>().await.unwrap();
        let config = database_config();
        let worker = Worker::with_config(config.clone());

        // Succeeds on the second attempt
        RUNS.store(0, Ordering::SeqCst);
        let handle = dispatch_with(&CountJob { fail_until: 1 }, &config).await.unwrap();
        assert_eq!(handle.status().await.unwrap(), JobStatus::Pending);
        assert!(worker.work_once().await.unwrap());
        assert_eq!(handle.status().await.unwrap(), JobStatus::Pending);
        assert!(worker.work_once().await.unwrap());
        assert_eq!(handle.status().await.unwrap(), JobStatus::Completed);
        assert!(!worker.work_once().await.unwrap());

        // Exhausts its attempts and runs the failed hook once
        RUNS.store(0, Ordering::SeqCst);
        FAILED_HOOKS.store(0, Ordering::SeqCst);
        let handle = dispatch_with(&CountJob { fail_until: 10 }, &config).await.unwrap();
        worker.work_once().await.unwrap();
        worker.work_once().await.unwrap();
        assert_eq!(handle.status().await.unwrap(), JobStatus::Failed);
        assert_eq!(FAILED_HOOKS.load(Ordering::SeqCst), 1);
        let record = store::find(handle.id()).await.unwrap();
        assert_eq!(record.attempts, 2);
        assert_eq!(record.error.as_deref(), Some("Internal server error: attempt 2 failed"));

        // Manual retry puts it back
        retry(handle.id()).await.unwrap();
        assert_eq!(handle.status().await.unwrap(), JobStatus::Pending);
        assert_eq!(retry(handle.id()).await.unwrap_err().status_code(), 409);

        // Sync connection runs inline, without retries
        RUNS.store(0, Ordering::SeqCst);
        let sync = config.clone().connection(QueueConnection::Sync);
        let handle = dispatch_with(&CountJob { fail_until: 0 }, &sync).await.unwrap();
        assert_eq!(handle.status().await.unwrap(), JobStatus::Completed);
        assert_eq!(RUNS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn worker_keeps_polling_through_database_errors() {
        let mut config = database_config();
        config.poll_interval_ms = 5;
        let worker = Worker::with_config(config);

        // No database is bound, so every claim fails
        let outcome = tokio::time::timeout(Duration::from_millis(100), worker.run()).await;
        assert!(outcome.is_err(), "worker stopped: {:?}", outcome);
    }

    #[tokio::test]
    async fn claims_are_exclusive() {
        let _db = TestDatabase::fresh::<QueueMigrator>().await.unwrap();
        let handle = store::insert("default", "queue_tests::count", "{}", 3).await.unwrap();
        let lease = ChronoDuration::seconds(60);

        assert!(store::claim(handle.id(), "a", lease).await.unwrap().is_some());
        assert!(store::claim(handle.id(), "b", lease).await.unwrap().is_none());
        assert_eq!(handle.status().await.unwrap(), JobStatus::Running);
    }
}
