//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use ovl_media::{FFMPEG, FFPROBE};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Jobs that may wait for a slot before uploads are refused
    pub queue_capacity: usize,
    /// Wall-clock limit for one FFmpeg render
    pub ffmpeg_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Output video codec
    pub video_codec: String,
    /// Output audio codec
    pub audio_codec: String,
    /// FFmpeg executable, looked up on `PATH` when not a path
    pub ffmpeg_path: PathBuf,
    /// FFprobe executable, looked up on `PATH` when not a path
    pub ffprobe_path: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            queue_capacity: 64,
            ffmpeg_timeout: Duration::from_secs(900), // 15 minutes
            shutdown_timeout: Duration::from_secs(30),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            ffmpeg_path: PathBuf::from(FFMPEG),
            ffprobe_path: PathBuf::from(FFPROBE),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(2),
            queue_capacity: std::env::var("WORKER_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(64),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("WORKER_FFMPEG_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(900),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            video_codec: std::env::var("WORKER_VIDEO_CODEC")
                .unwrap_or_else(|_| "libx264".to_string()),
            audio_codec: std::env::var("WORKER_AUDIO_CODEC").unwrap_or_else(|_| "aac".to_string()),
            ffmpeg_path: std::env::var("WORKER_FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(FFMPEG)),
            ffprobe_path: std::env::var("WORKER_FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(FFPROBE)),
        }
    }

    /// Queue settings matching this worker pool.
    pub fn queue_config(&self) -> ovl_queue::QueueConfig {
        ovl_queue::QueueConfig {
            capacity: self.queue_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.ffmpeg_timeout, Duration::from_secs(900));
        assert_eq!(config.queue_config().capacity, 64);
        assert_eq!(config.video_codec, "libx264");
        assert_eq!(config.audio_codec, "aac");
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
    }

    #[test]
    fn test_zero_ffmpeg_timeout_falls_back_to_default() {
        std::env::set_var("WORKER_FFMPEG_TIMEOUT", "0");
        let config = WorkerConfig::from_env();
        std::env::remove_var("WORKER_FFMPEG_TIMEOUT");

        assert_eq!(config.ffmpeg_timeout, Duration::from_secs(900));
    }
}
