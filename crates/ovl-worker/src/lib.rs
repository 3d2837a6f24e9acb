//! Overlay render worker.
//!
//! This crate provides:
//! - The job state machine driving probe, graph construction and rendering
//! - A bounded executor pool fed by the admission queue
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use processor::{process_job, run_job, JobTracker, ProcessingContext};
