//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use ovl_queue::{JobReceiver, JobStore, RenderJob};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::{run_job, ProcessingContext};

const SHUTDOWN_ERROR: &str = "Worker shut down before the job started";

/// Bounded pool that runs queued jobs.
pub struct JobExecutor {
    config: WorkerConfig,
    store: Arc<dyn JobStore>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, store: Arc<dyn JobStore>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            store,
            job_semaphore,
            shutdown,
        }
    }

    /// Consume jobs until shutdown or until every producer is gone.
    pub async fn run(&self, mut jobs: JobReceiver) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let ctx = Arc::new(ProcessingContext::new(
            self.config.clone(),
            Arc::clone(&self.store),
        ));
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received, stopping executor");
                break;
            }

            let permit = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                permit = Arc::clone(&self.job_semaphore).acquire_owned() => permit
                    .map_err(|_| WorkerError::processing_failed("Semaphore closed"))?,
            };

            let job = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => {
                        info!("Job queue closed, stopping executor");
                        break;
                    }
                },
            };

            debug!(job_id = %job.job_id, "Dispatching job");
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let _permit = permit;
                let job_id = job.job_id.clone();
                let status = run_job(ctx, job).await;
                info!(job_id = %job_id, status = %status, "Job finished");
            });
        }

        jobs.close();
        while let Some(job) = jobs.recv().await {
            self.abandon(job).await;
        }

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "In-flight jobs still running after {:?}",
                self.config.shutdown_timeout
            );
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Fail a job that was admitted but never started.
    async fn abandon(&self, job: RenderJob) {
        match self.store.get(&job.job_id).await {
            Ok(Some(mut record)) => {
                record.fail(SHUTDOWN_ERROR, format!("Error: {}", SHUTDOWN_ERROR));
                if let Err(e) = self.store.save(&record).await {
                    warn!(job_id = %job.job_id, "Failed to record abandoned job: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(job_id = %job.job_id, "Failed to load abandoned job: {}", e),
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        let total = self.config.max_concurrent_jobs.max(1);
        while self.job_semaphore.available_permits() < total {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Number of jobs currently running.
    pub fn active_jobs(&self) -> usize {
        self.config.max_concurrent_jobs.max(1) - self.job_semaphore.available_permits()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
