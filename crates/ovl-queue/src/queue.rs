//! Bounded admission queue between the API and the worker pool.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::RenderJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Jobs that may wait for a worker slot before uploads are refused
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<RenderJob>,
    capacity: usize,
}

/// Consumer side of the queue, owned by the executor.
#[derive(Debug)]
pub struct JobReceiver {
    receiver: mpsc::Receiver<RenderJob>,
}

impl JobQueue {
    /// Create a queue and its single consumer.
    pub fn new(config: QueueConfig) -> (Self, JobReceiver) {
        let capacity = config.capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, capacity }, JobReceiver { receiver })
    }

    /// Admit a job without waiting.
    ///
    /// Fails with [`QueueError::QueueFull`] when the backlog is at capacity.
    pub fn enqueue(&self, job: RenderJob) -> QueueResult<()> {
        let job_id = job.job_id.clone();
        match self.sender.try_send(job) {
            Ok(()) => {
                debug!(job_id = %job_id, depth = self.len(), "Enqueued job");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(job_id = %job_id, capacity = self.capacity, "Queue full, rejecting job");
                Err(QueueError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Jobs currently waiting.
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl JobReceiver {
    /// Wait for the next job. `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<RenderJob> {
        self.receiver.recv().await
    }

    /// Stop accepting new jobs; already queued jobs can still be drained.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovl_models::JobId;
    use std::path::Path;
    use tokio_test::assert_ok;

    fn job() -> RenderJob {
        let id = JobId::new();
        RenderJob::new(
            id.clone(),
            Path::new("uploads").join(id.as_str()),
            Vec::new(),
            960.0,
            540.0,
            Path::new("results"),
        )
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut rx) = JobQueue::new(QueueConfig { capacity: 4 });
        let first = job();
        let second = job();
        let (a, b) = (first.job_id.clone(), second.job_id.clone());

        assert_ok!(queue.enqueue(first));
        assert_ok!(queue.enqueue(second));
        assert_eq!(queue.len(), 2);

        assert_eq!(rx.recv().await.unwrap().job_id, a);
        assert_eq!(rx.recv().await.unwrap().job_id, b);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let (queue, _rx) = JobQueue::new(QueueConfig { capacity: 1 });
        assert_ok!(queue.enqueue(job()));

        let err = queue.enqueue(job()).unwrap_err();
        assert!(matches!(err, QueueError::QueueFull { capacity: 1 }));
    }

    #[tokio::test]
    async fn test_closed_queue() {
        let (queue, rx) = JobQueue::new(QueueConfig::default());
        drop(rx);

        assert!(queue.is_closed());
        assert!(matches!(queue.enqueue(job()), Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_receiver_ends_when_producers_drop() {
        let (queue, mut rx) = JobQueue::new(QueueConfig::default());
        assert_ok!(queue.enqueue(job()));
        drop(queue);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
