//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Probe failed: {message}")]
    Probe {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a probe failure error.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
            stderr: None,
        }
    }

    /// Create an invalid dimensions error.
    pub fn invalid_dimensions(message: impl Into<String>) -> Self {
        Self::InvalidDimensions(message.into())
    }

    /// Diagnostic text to show a user, bounded to `max_chars`.
    ///
    /// For engine failures this is the engine's own stderr output.
    pub fn diagnostic(&self, max_chars: usize) -> String {
        let text = match self {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => stderr.trim().to_string(),
            other => other.to_string(),
        };
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_prefers_stderr_and_truncates() {
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some(format!("  {}\n", "x".repeat(500))),
            Some(1),
        );
        let diag = err.diagnostic(200);
        assert_eq!(diag.chars().count(), 200);
        assert!(diag.starts_with('x'));
    }

    #[test]
    fn test_diagnostic_falls_back_to_message() {
        let err = MediaError::ffmpeg_failed("FFmpeg exited with non-zero status", None, Some(1));
        assert_eq!(
            err.diagnostic(200),
            "FFmpeg command failed: FFmpeg exited with non-zero status"
        );

        let err = MediaError::Timeout(900);
        assert!(err.diagnostic(10).len() <= 10);
    }
}
