//! Render job record and lifecycle.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, waiting for a worker slot
    #[default]
    Queued,
    /// Owned by a worker task
    Processing,
    /// Output written
    Done,
    /// Aborted with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress milestones reported while a job runs.
pub mod progress {
    pub const STARTED: u8 = 10;
    pub const GRAPH_BUILT: u8 = 30;
    pub const RENDERED: u8 = 90;
    pub const FINALIZED: u8 = 100;
}

/// A render job as seen by status queries.
///
/// Mutators are no-ops once the job reached a terminal state, and
/// progress never moves backwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Progress (0-100)
    pub progress: u8,
    /// Human readable step description
    pub message: String,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rendered file on disk (set only when done)
    #[serde(skip)]
    pub out_path: Option<PathBuf>,
    /// Where the result can be fetched (set only when done)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a queued job.
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            error: None,
            out_path: None,
            output_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move a queued job into processing.
    pub fn start(&mut self, message: impl Into<String>) {
        if self.status != JobStatus::Queued {
            return;
        }
        self.status = JobStatus::Processing;
        self.message = message.into();
        self.set_progress(progress::STARTED);
    }

    /// Record a progress milestone with a step message.
    pub fn advance(&mut self, value: u8, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.message = message.into();
        self.set_progress(value);
    }

    fn set_progress(&mut self, value: u8) {
        self.progress = self.progress.max(value.min(100));
        self.updated_at = Utc::now();
    }

    /// Mark job as done with its rendered output.
    pub fn complete(&mut self, out_path: PathBuf, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.output_url = Some(format!("/result/{}", self.id));
        self.out_path = Some(out_path);
        self.status = JobStatus::Done;
        self.message = message.into();
        self.set_progress(progress::FINALIZED);
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.message = message.into();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new(JobId::new());
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.out_path.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_job_state_transitions() {
        let mut job = Job::new(JobId::from_string("job-1"));

        job.start("Starting processing...");
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, progress::STARTED);

        job.advance(progress::GRAPH_BUILT, "Building filters...");
        assert_eq!(job.progress, 30);

        job.complete(PathBuf::from("results/job-1.mp4"), "Video processing completed");
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.progress, 100);
        assert_eq!(job.output_url.as_deref(), Some("/result/job-1"));
        assert!(job.is_terminal());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = Job::new(JobId::new());
        job.start("Starting processing...");
        job.advance(90, "Rendering overlays...");
        job.advance(30, "Building filters...");
        assert_eq!(job.progress, 90);
    }

    #[test]
    fn test_terminal_job_is_frozen() {
        let mut job = Job::new(JobId::new());
        job.start("Starting processing...");
        job.fail("boom", "Error: boom");
        assert_eq!(job.status, JobStatus::Failed);

        job.complete(PathBuf::from("out.mp4"), "Video processing completed");
        job.advance(100, "late");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.out_path.is_none());
        assert_eq!(job.message, "Error: boom");
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Done).unwrap(), "\"done\"");
        assert_eq!(JobStatus::Processing.to_string(), "processing");
    }
}
