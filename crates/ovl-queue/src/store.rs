//! Job status records.
//!
//! The API reads from the store and the worker task that owns a job is its
//! only writer. Terminal records are frozen.

use std::collections::HashMap;

use async_trait::async_trait;
use ovl_models::{Job, JobId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{QueueError, QueueResult};

/// Storage for job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Register a new job. Fails if the ID is taken.
    async fn insert(&self, job: Job) -> QueueResult<()>;

    /// Snapshot of a job.
    async fn get(&self, id: &JobId) -> QueueResult<Option<Job>>;

    /// Replace a job with a newer snapshot.
    ///
    /// Rejected once the stored record is terminal.
    async fn save(&self, job: &Job) -> QueueResult<()>;

    /// Drop a job that never got admitted.
    async fn remove(&self, id: &JobId) -> QueueResult<Option<Job>>;

    /// Number of known jobs.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-local job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(QueueError::DuplicateJob(job.id.to_string()));
        }
        debug!(job_id = %job.id, "Registered job");
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> QueueResult<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn save(&self, job: &Job) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        let current = jobs
            .get_mut(&job.id)
            .ok_or_else(|| QueueError::JobNotFound(job.id.to_string()))?;

        if current.is_terminal() {
            return Err(QueueError::TerminalJob(job.id.to_string()));
        }

        *current = job.clone();
        Ok(())
    }

    async fn remove(&self, id: &JobId) -> QueueResult<Option<Job>> {
        Ok(self.jobs.write().await.remove(id))
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}
