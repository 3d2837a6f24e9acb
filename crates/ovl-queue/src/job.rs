//! Job payload handed from the API to the worker pool.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ovl_models::{JobId, Overlay};
use serde::{Deserialize, Serialize};

/// Everything a worker needs to render one upload.
///
/// The job directory holds the source video, every uploaded asset and an
/// `overlays.json` copy of the overlay list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Per-job directory under the upload root
    pub job_dir: PathBuf,
    /// Uploaded source video
    pub video_path: PathBuf,
    /// Validated overlay list
    pub overlays: Vec<Overlay>,
    /// Editor preview width in container units
    pub container_width: f64,
    /// Editor preview height in container units
    pub container_height: f64,
    /// Where the rendered file is written
    pub output_path: PathBuf,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
}

impl RenderJob {
    /// Create a job whose files live in `job_dir`.
    pub fn new(
        job_id: JobId,
        job_dir: impl Into<PathBuf>,
        overlays: Vec<Overlay>,
        container_width: f64,
        container_height: f64,
        result_dir: &Path,
    ) -> Self {
        let job_dir = job_dir.into();
        let output_path = result_dir.join(format!("{}.mp4", job_id));
        Self {
            video_path: job_dir.join(Self::VIDEO_FILE),
            job_id,
            job_dir,
            overlays,
            container_width,
            container_height,
            output_path,
            created_at: Utc::now(),
        }
    }

    /// File name of the stored source video.
    pub const VIDEO_FILE: &'static str = "input.mp4";

    /// File name of the stored overlay list.
    pub const OVERLAYS_FILE: &'static str = "overlays.json";

    /// Directory in which overlay assets are looked up.
    pub fn asset_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn overlays_path(&self) -> PathBuf {
        self.job_dir.join(Self::OVERLAYS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let id = JobId::from_string("abc");
        let job = RenderJob::new(
            id,
            "/data/uploads/abc",
            Vec::new(),
            960.0,
            540.0,
            Path::new("/data/results"),
        );

        assert_eq!(job.video_path, PathBuf::from("/data/uploads/abc/input.mp4"));
        assert_eq!(job.output_path, PathBuf::from("/data/results/abc.mp4"));
        assert_eq!(job.overlays_path(), PathBuf::from("/data/uploads/abc/overlays.json"));
        assert_eq!(job.asset_dir(), Path::new("/data/uploads/abc"));
    }
}
