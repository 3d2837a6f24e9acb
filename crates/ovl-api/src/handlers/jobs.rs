//! Job status and result handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Response, StatusCode};
use axum::Json;
use ovl_models::{Job, JobId, JobStatus};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    /// queued, processing, done or failed
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Current processing step
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            progress: job.progress,
            message: job.message,
            error: job.error,
            output_url: job.output_url,
        }
    }
}

async fn load_job(state: &AppState, job_id: String) -> ApiResult<Job> {
    let id = JobId::from_string(job_id);
    state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Job {}", id)))
}

/// Current state of a job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = load_job(&state, job_id).await?;
    Ok(Json(job.into()))
}

/// Rendered video of a finished job.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response<Body>> {
    let job = load_job(&state, job_id).await?;

    let out_path = match (job.status, job.out_path.as_ref()) {
        (JobStatus::Done, Some(path)) => path,
        _ => return Err(ApiError::NotReady { status: job.status }),
    };

    let bytes = tokio::fs::read(out_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found(format!("Output for job {}", job.id))
        } else {
            ApiError::Io(e)
        }
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"output_{}.mp4\"", job.id),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
