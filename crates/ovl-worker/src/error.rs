//! Worker error types.

use ovl_media::MediaError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Longest compositing diagnostic stored on a failed job.
pub const DIAGNOSTIC_MAX_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Queue(#[from] ovl_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Whether FFmpeg itself rejected the render.
    pub fn is_compositing_failure(&self) -> bool {
        matches!(self, WorkerError::Media(MediaError::FfmpegFailed { .. }))
    }

    /// Error text and step message recorded on the failed job.
    pub fn failure_report(&self) -> (String, String) {
        match self {
            WorkerError::Media(err @ MediaError::FfmpegFailed { .. }) => (
                format!("FFmpeg error: {}", err.diagnostic(DIAGNOSTIC_MAX_CHARS)),
                "Processing failed".to_string(),
            ),
            other => (other.to_string(), format!("Error: {}", other)),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::ProcessingFailed(_) => "processing",
            WorkerError::Media(MediaError::FfmpegFailed { .. }) => "ffmpeg",
            WorkerError::Media(MediaError::Timeout(_)) => "timeout",
            WorkerError::Media(MediaError::Probe { .. }) => "probe",
            WorkerError::Media(_) => "media",
            WorkerError::Queue(_) => "queue",
            WorkerError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_failure_report() {
        let err = WorkerError::from(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("e".repeat(300)),
            Some(1),
        ));
        assert!(err.is_compositing_failure());

        let (error, message) = err.failure_report();
        assert_eq!(message, "Processing failed");
        assert!(error.starts_with("FFmpeg error: "));
        assert_eq!(error.chars().count(), "FFmpeg error: ".len() + 200);
        assert_eq!(err.kind(), "ffmpeg");
    }

    #[test]
    fn test_other_failure_report() {
        let err = WorkerError::from(MediaError::probe("No video stream found"));
        let (error, message) = err.failure_report();
        assert_eq!(error, "Probe failed: No video stream found");
        assert_eq!(message, "Error: Probe failed: No video stream found");
        assert_eq!(err.kind(), "probe");
    }
}
