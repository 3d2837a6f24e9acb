//! Overlay render orchestration.
//!
//! A job moves through probe, transform, graph construction and either a
//! plain copy or an FFmpeg render. The task driving a job is its only
//! writer; every step is saved to the job store so status queries see it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ovl_media::{
    copy_file, probe_video_with, CompositionPlan, FfmpegProgress, FfmpegRunner, FilterGraphBuilder,
    Transform, VideoInfo,
};
use ovl_models::{progress, Job, JobId, JobStatus};
use ovl_queue::{JobStore, RenderJob};
use tracing::{debug, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

pub const MSG_STARTING: &str = "Starting processing...";
pub const MSG_BUILDING: &str = "Building filters...";
pub const MSG_RENDERING: &str = "Rendering overlays...";
pub const MSG_COMPLETED: &str = "Video processing completed";

const OPERATION: &str = "render_overlays";

/// Shared state for every job run by this worker pool.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub store: Arc<dyn JobStore>,
}

impl ProcessingContext {
    pub fn new(config: WorkerConfig, store: Arc<dyn JobStore>) -> Self {
        Self { config, store }
    }
}

/// Working copy of a job record, saved after each transition.
pub struct JobTracker {
    store: Arc<dyn JobStore>,
    job: Job,
    logger: JobLogger,
}

impl JobTracker {
    /// Load the latest snapshot of a job.
    pub async fn load(store: Arc<dyn JobStore>, id: &JobId, logger: JobLogger) -> Self {
        let job = match store.get(id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                logger.log_warning("Job missing from store, tracking a fresh record");
                Job::new(id.clone())
            }
            Err(e) => {
                logger.log_warning(&format!("Failed to load job: {}", e));
                Job::new(id.clone())
            }
        };
        Self { store, job, logger }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn logger(&self) -> &JobLogger {
        &self.logger
    }

    async fn save(&self) {
        if let Err(e) = self.store.save(&self.job).await {
            self.logger
                .log_warning(&format!("Failed to save job state: {}", e));
        }
    }

    pub async fn start(&mut self, message: &str) {
        self.job.start(message);
        self.logger.log_start(message);
        self.save().await;
    }

    pub async fn advance(&mut self, value: u8, message: &str) {
        if self.job.is_terminal() {
            return;
        }
        self.job.advance(value, message);
        self.logger.log_progress(self.job.progress, message);
        self.save().await;
    }

    /// Raise progress without changing the step message.
    async fn bump(&mut self, value: u8) {
        if self.job.is_terminal() || value <= self.job.progress {
            return;
        }
        let message = self.job.message.clone();
        self.job.advance(value, message);
        debug!(job_id = %self.job.id, progress = value, "Render progress");
        self.save().await;
    }

    pub async fn complete(&mut self, out_path: PathBuf) {
        self.job.complete(out_path, MSG_COMPLETED);
        self.logger.log_completion(MSG_COMPLETED);
        self.save().await;
    }

    pub async fn fail(&mut self, err: &WorkerError) {
        let (error, message) = err.failure_report();
        self.logger.log_error(&error);
        self.job.fail(error, message);
        self.save().await;
    }
}

/// Run one job to a terminal state.
///
/// The pipeline runs on its own task so that a panic still leaves the job
/// `failed` instead of stuck in `processing`.
pub async fn run_job(ctx: Arc<ProcessingContext>, job: RenderJob) -> JobStatus {
    let logger = JobLogger::new(&job.job_id, OPERATION);
    let span = logger.create_span();
    let job_id = job.job_id.clone();

    let task_ctx = Arc::clone(&ctx);
    let handle = tokio::spawn(
        async move { process_job(&task_ctx, &job).await }.instrument(span),
    );

    let outcome = match handle.await {
        Ok(result) => result,
        Err(e) => Err(WorkerError::processing_failed(format!(
            "render task aborted: {}",
            e
        ))),
    };

    let mut tracker = JobTracker::load(Arc::clone(&ctx.store), &job_id, logger).await;
    match outcome {
        Ok(out_path) => {
            tracker.complete(out_path).await;
            metrics::counter!("ovl_jobs_completed_total").increment(1);
        }
        Err(e) => {
            tracker.fail(&e).await;
            metrics::counter!("ovl_jobs_failed_total", "reason" => e.kind()).increment(1);
        }
    }

    tracker.job().status
}

/// Probe the source and render it. Returns the output path.
pub async fn process_job(ctx: &ProcessingContext, job: &RenderJob) -> WorkerResult<PathBuf> {
    let logger = JobLogger::new(&job.job_id, OPERATION);
    let mut tracker = JobTracker::load(Arc::clone(&ctx.store), &job.job_id, logger).await;
    tracker.start(MSG_STARTING).await;

    let info = probe_video_with(&ctx.config.ffprobe_path, &job.video_path).await?;
    debug!(
        job_id = %job.job_id,
        width = info.width,
        height = info.height,
        duration = info.duration,
        "Probed source video"
    );

    render(ctx, job, &info, &mut tracker).await
}

/// Compose the overlays onto a probed source.
pub async fn render(
    ctx: &ProcessingContext,
    job: &RenderJob,
    info: &VideoInfo,
    tracker: &mut JobTracker,
) -> WorkerResult<PathBuf> {
    let transform = Transform::compute(
        job.container_width,
        job.container_height,
        info.width as f64,
        info.height as f64,
    )?;

    tracker.advance(progress::GRAPH_BUILT, MSG_BUILDING).await;

    let mut builder = FilterGraphBuilder::new(transform, info.duration, job.asset_dir());
    let plan = builder.build(&job.overlays);
    if !builder.skipped().is_empty() {
        tracker.logger().log_warning(&format!(
            "{} of {} overlays skipped",
            builder.skipped().len(),
            job.overlays.len()
        ));
    }

    if let Some(parent) = job.output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match plan {
        CompositionPlan::CopyOnly => {
            let bytes = copy_file(&job.video_path, &job.output_path).await?;
            debug!(job_id = %job.job_id, bytes, "No overlays to draw, copied source");
        }
        CompositionPlan::Graph(graph) => {
            tracker.advance(progress::GRAPH_BUILT, MSG_RENDERING).await;

            let cmd = graph.to_command(
                &job.video_path,
                &job.output_path,
                &ctx.config.video_codec,
                &ctx.config.audio_codec,
            );
            let runner = FfmpegRunner::new()
                .with_program(&ctx.config.ffmpeg_path)
                .with_timeout(ctx.config.ffmpeg_timeout.as_secs());
            let started = Instant::now();

            let result = run_with_tracking(&runner, &cmd, info.duration, tracker).await;
            metrics::histogram!("ovl_ffmpeg_duration_seconds")
                .record(started.elapsed().as_secs_f64());

            if let Err(e) = result {
                let _ = tokio::fs::remove_file(&job.output_path).await;
                return Err(e.into());
            }
        }
    }

    tracker.bump(progress::RENDERED).await;
    Ok(job.output_path.clone())
}

/// Map FFmpeg progress into the 30..90 band while the render runs.
fn render_progress(p: &FfmpegProgress, duration_secs: f64) -> u8 {
    let total_ms = (duration_secs * 1000.0) as i64;
    let span = f64::from(progress::RENDERED - progress::GRAPH_BUILT);
    progress::GRAPH_BUILT + (span * p.percentage(total_ms) / 100.0) as u8
}

async fn run_with_tracking(
    runner: &FfmpegRunner,
    cmd: &ovl_media::FfmpegCommand,
    duration_secs: f64,
    tracker: &mut JobTracker,
) -> ovl_media::MediaResult<()> {
    let (tx, mut rx) = tokio::sync::watch::channel(progress::GRAPH_BUILT);

    let render = runner.run_with_progress(cmd, move |p| {
        tx.send_replace(render_progress(&p, duration_secs));
    });
    tokio::pin!(render);

    loop {
        tokio::select! {
            result = &mut render => return result,
            changed = rx.changed() => match changed {
                Ok(()) => {
                    let value = *rx.borrow_and_update();
                    tracker.bump(value).await;
                }
                Err(_) => return (&mut render).await,
            },
        }
    }
}
