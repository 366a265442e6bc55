//! Job registry via inventory

use crate::error::FrameworkError;
use std::future::Future;
use std::pin::Pin;

pub type JobFuture = Pin<Box<dyn Future<Output = Result<(), FrameworkError>> + Send>>;

/// Runs a job from its JSON payload
pub type JobRunner = fn(String) -> JobFuture;

/// Runs a job's failure hook from its JSON payload and the last error
pub type JobFailer = fn(String, String) -> JobFuture;

/// Inventory entry for a job type, submitted by `register_job!`
pub struct JobEntry {
    pub name: &'static str,
    pub run: JobRunner,
    pub fail: JobFailer,
}

inventory::collect!(JobEntry);

pub fn find(name: &str) -> Option<&'static JobEntry> {
    inventory::iter::<JobEntry>
        .into_iter()
        .find(|entry| entry.name == name)
}
