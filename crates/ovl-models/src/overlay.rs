//! Overlay definitions submitted alongside an upload.
//!
//! Geometry is expressed in *container space*: the coordinate system of the
//! editor's preview box, not the pixel grid of the source video.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Font size used when a text overlay has no style.
pub const DEFAULT_FONT_SIZE: f64 = 35.0;

/// Width/height used when an image or video overlay omits them.
pub const DEFAULT_OVERLAY_SIZE: f64 = 100.0;

const FILE_SCHEME: &str = "file://";

/// Errors raised while accepting an overlay list.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Malformed overlay JSON: {0}")]
    MalformedJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid overlay #{index}: {reason}")]
    InvalidOverlay { index: usize, reason: String },

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl UploadError {
    pub fn missing_field(name: impl Into<String>) -> Self {
        Self::MissingField(name.into())
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Kind of overlay, used for grouping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Text,
    Image,
    Video,
}

impl OverlayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayKind::Text => "text",
            OverlayKind::Image => "image",
            OverlayKind::Video => "video",
        }
    }
}

/// A single overlay, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Overlay {
    Text(TextOverlay),
    Image(AssetOverlay),
    Video(AssetOverlay),
}

/// Text drawn directly onto the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "startTime")]
    pub start_time: f64,
    #[serde(default, alias = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

/// Styling for text overlays. Editor-only fields are accepted and dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default, rename = "fontSize", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

/// Image or video clip referenced by file name in the job's asset directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    #[serde(default, alias = "startTime")]
    pub start_time: f64,
    #[serde(default, alias = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_size")]
    pub width: f64,
    #[serde(default = "default_size")]
    pub height: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_size() -> f64 {
    DEFAULT_OVERLAY_SIZE
}

fn default_scale() -> f64 {
    1.0
}

/// Inclusive visibility window in seconds on the base timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

impl TextOverlay {
    /// Font size in container units.
    pub fn font_size(&self) -> f64 {
        self.style
            .as_ref()
            .and_then(|s| s.font_size)
            .unwrap_or(DEFAULT_FONT_SIZE)
    }
}

impl AssetOverlay {
    /// File name of the referenced asset.
    ///
    /// Strips a `file://` scheme and any directory part so that lookups stay
    /// inside the job's asset directory.
    pub fn asset_file_name(&self) -> Option<&str> {
        let raw = self.content.strip_prefix(FILE_SCHEME).unwrap_or(&self.content);
        Path::new(raw)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty() && *n != "..")
    }
}

impl Overlay {
    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::Text(_) => OverlayKind::Text,
            Overlay::Image(_) => OverlayKind::Image,
            Overlay::Video(_) => OverlayKind::Video,
        }
    }

    fn times(&self) -> (f64, Option<f64>) {
        match self {
            Overlay::Text(t) => (t.start_time, t.end_time),
            Overlay::Image(a) | Overlay::Video(a) => (a.start_time, a.end_time),
        }
    }

    /// Visibility window; a missing end extends to the end of the video.
    pub fn window(&self, duration: f64) -> TimeWindow {
        let (start, end) = self.times();
        TimeWindow {
            start,
            end: end.unwrap_or(duration),
        }
    }

    /// Check the invariants on timing and geometry.
    pub fn validate(&self) -> Result<(), String> {
        let (start, end) = self.times();
        if !start.is_finite() || start < 0.0 {
            return Err(format!("start_time must be a non-negative number, got {}", start));
        }
        if let Some(end) = end {
            if !end.is_finite() || end < start {
                return Err(format!("end_time ({}) must not precede start_time ({})", end, start));
            }
        }

        let (geometry, scale): (Vec<(&str, f64)>, Option<f64>) = match self {
            Overlay::Text(t) => (vec![("x", t.x), ("y", t.y)], None),
            Overlay::Image(a) | Overlay::Video(a) => (
                vec![("x", a.x), ("y", a.y), ("width", a.width), ("height", a.height)],
                Some(a.scale),
            ),
        };
        for (name, value) in geometry {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }
        if let Some(scale) = scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(format!("scale must be positive, got {}", scale));
            }
        }

        match self {
            Overlay::Text(t) => {
                if !t.font_size().is_finite() || t.font_size() <= 0.0 {
                    return Err("style.fontSize must be positive".to_string());
                }
            }
            Overlay::Image(a) | Overlay::Video(a) => {
                if a.content.trim().is_empty() {
                    return Err("content must reference an asset".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Parse and validate the JSON overlay list sent with an upload.
pub fn parse_overlays(json: &str) -> Result<Vec<Overlay>, UploadError> {
    let overlays: Vec<Overlay> =
        serde_json::from_str(json).map_err(|e| UploadError::MalformedJson(e.to_string()))?;

    for (index, overlay) in overlays.iter().enumerate() {
        overlay
            .validate()
            .map_err(|reason| UploadError::InvalidOverlay { index, reason })?;
    }

    Ok(overlays)
}
