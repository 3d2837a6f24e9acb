#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for overlay composition.
//!
//! This crate provides:
//! - Video probing through `ffprobe`
//! - The container-to-pixel coordinate transform
//! - Filter graph construction for image, video and text overlays
//! - Type-safe FFmpeg command building with progress parsing from `-progress pipe:1`

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod graph;
pub mod probe;
pub mod progress;
pub mod transform;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner, FFMPEG, FFPROBE};
pub use error::{MediaError, MediaResult};
pub use fs_utils::copy_file;
pub use graph::{
    build_plan, escape_drawtext, CompositionPlan, DrawText, FilterGraph, FilterGraphBuilder,
    FilterOp, SkippedOverlay, StreamLabel,
};
pub use probe::{parse_probe_output, probe_video, probe_video_with, VideoInfo};
pub use progress::FfmpegProgress;
pub use transform::{PixelRect, Transform, TEXT_PADDING};
