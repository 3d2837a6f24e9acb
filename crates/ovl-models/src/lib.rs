//! Shared data models for the overlay render service.
//!
//! This crate provides Serde-serializable types for:
//! - Render jobs and their status lifecycle
//! - Text, image, and video overlays in container space

pub mod job;
pub mod overlay;

// Re-export common types
pub use job::{progress, Job, JobId, JobStatus};
pub use overlay::{
    parse_overlays, AssetOverlay, Overlay, OverlayKind, TextOverlay, TextStyle, TimeWindow,
    UploadError, DEFAULT_FONT_SIZE, DEFAULT_OVERLAY_SIZE,
};
