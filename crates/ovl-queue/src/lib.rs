//! Job admission and job state storage.
//!
//! This crate provides:
//! - A bounded in-process queue feeding the worker pool
//! - The job store shared by the API and the workers

pub mod error;
pub mod job;
pub mod queue;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use job::RenderJob;
pub use queue::{JobQueue, JobReceiver, QueueConfig};
pub use store::{InMemoryJobStore, JobStore};
