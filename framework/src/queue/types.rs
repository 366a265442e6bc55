//! Queue public types

use crate::error::FrameworkError;
use crate::queue::store;

/// Job row status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Handle for a dispatched job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    id: i64,
}

impl JobHandle {
    pub(crate) fn new(id: i64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub async fn status(&self) -> Result<JobStatus, FrameworkError> {
        let record = store::find(self.id).await?;
        JobStatus::parse(&record.status)
            .ok_or_else(|| FrameworkError::internal("Invalid job status"))
    }
}

/// A job row this worker holds the lease for
#[derive(Debug, Clone)]
pub(crate) struct ClaimedJob {
    pub id: i64,
    pub name: String,
    pub payload: String,
    pub attempts: i32,
    pub max_attempts: i32,
}
