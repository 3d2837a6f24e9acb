//! Upload handler.
//!
//! Files are streamed into a staging directory inside the upload root. The
//! staging directory becomes `<upload_dir>/<job_id>` only once every field
//! has been read and the overlay list validated, so a rejected upload
//! leaves nothing behind and creates no job.

use std::path::Path;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use ovl_models::{parse_overlays, Job, JobId, Overlay, UploadError};
use ovl_queue::{QueueError, RenderJob};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// Fields collected from the multipart body.
#[derive(Default)]
struct UploadForm {
    has_video: bool,
    overlays: Option<String>,
    container_width: Option<String>,
    container_height: Option<String>,
    assets: Vec<String>,
}

/// Validated upload, ready to become a job.
struct AcceptedUpload {
    overlays: Vec<Overlay>,
    container_width: f64,
    container_height: f64,
}

impl UploadForm {
    fn validate(self) -> Result<AcceptedUpload, UploadError> {
        if !self.has_video {
            return Err(UploadError::missing_field("video"));
        }
        let overlays = self
            .overlays
            .ok_or_else(|| UploadError::missing_field("overlays"))?;
        let overlays = parse_overlays(&overlays)?;

        Ok(AcceptedUpload {
            overlays,
            container_width: parse_dimension("container_width", self.container_width)?,
            container_height: parse_dimension("container_height", self.container_height)?,
        })
    }
}

fn parse_dimension(field: &str, raw: Option<String>) -> Result<f64, UploadError> {
    let raw = raw.ok_or_else(|| UploadError::missing_field(field))?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| UploadError::invalid_field(field, format!("'{}' is not a number", raw)))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(UploadError::invalid_field(field, "must be positive"));
    }
    Ok(value)
}

/// Base name of an uploaded asset, or `None` if it cannot be stored safely.
fn asset_file_name(raw: &str) -> Option<&str> {
    // Browsers on Windows may send full paths
    let name = raw.rsplit(|c: char| c == '/' || c == '\\').next()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    if name == RenderJob::VIDEO_FILE || name == RenderJob::OVERLAYS_FILE {
        return None;
    }
    Some(name)
}

async fn save_field(mut field: Field<'_>, path: &Path) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn read_form(multipart: &mut Multipart, staging: &Path) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                save_field(field, &staging.join(RenderJob::VIDEO_FILE)).await?;
                form.has_video = true;
            }
            "assets" => {
                let raw = field.file_name().unwrap_or_default().to_string();
                let file_name = asset_file_name(&raw).ok_or_else(|| {
                    UploadError::invalid_field("assets", format!("unusable file name '{}'", raw))
                })?;
                let file_name = file_name.to_string();
                save_field(field, &staging.join(&file_name)).await?;
                form.assets.push(file_name);
            }
            "overlays" => form.overlays = Some(field.text().await?),
            "container_width" => form.container_width = Some(field.text().await?),
            "container_height" => form.container_height = Some(field.text().await?),
            other => warn!(field = %other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

/// Accept a video, its overlay list and assets, and queue a render job.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload_dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir).await?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(upload_dir)?;

    let form = read_form(&mut multipart, staging.path()).await?;
    let asset_count = form.assets.len();
    let accepted = form.validate()?;

    let job_id = JobId::new();
    let job_dir = upload_dir.join(job_id.as_str());

    let overlays_json = serde_json::to_vec_pretty(&accepted.overlays)
        .map_err(|e| ApiError::internal(format!("Failed to serialize overlays: {}", e)))?;
    tokio::fs::write(staging.path().join(RenderJob::OVERLAYS_FILE), overlays_json).await?;
    tokio::fs::rename(staging.path(), &job_dir).await?;

    let render_job = RenderJob::new(
        job_id.clone(),
        job_dir.clone(),
        accepted.overlays,
        accepted.container_width,
        accepted.container_height,
        &state.config.result_dir,
    );

    state.store.insert(Job::new(job_id.clone())).await?;

    if let Err(e) = state.queue.enqueue(render_job) {
        discard(&state, &job_id, &job_dir).await;
        metrics::record_job_rejected(match e {
            QueueError::QueueFull { .. } => "queue_full",
            _ => "queue_closed",
        });
        return Err(e.into());
    }

    metrics::record_job_enqueued(state.queue.len());
    info!(
        job_id = %job_id,
        assets = asset_count,
        "Accepted upload"
    );

    Ok(Json(UploadResponse {
        job_id: job_id.to_string(),
        status: "processing".to_string(),
        message: "Video upload successful".to_string(),
    }))
}

/// Remove every trace of an upload that could not be admitted.
async fn discard(state: &AppState, job_id: &JobId, job_dir: &Path) {
    if let Err(e) = state.store.remove(job_id).await {
        warn!(job_id = %job_id, "Failed to remove rejected job: {}", e);
    }
    if let Err(e) = tokio::fs::remove_dir_all(job_dir).await {
        warn!(job_id = %job_id, "Failed to remove rejected upload: {}", e);
    }
}
