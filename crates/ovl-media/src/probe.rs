//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::FFPROBE;
use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a video file for duration and frame size using `ffprobe` from `PATH`.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    probe_video_with(FFPROBE, path).await
}

/// Probe a video file with an explicit ffprobe binary.
///
/// Spawns exactly one process restricted to the first video stream. A missing
/// source is reported as a probe failure.
pub async fn probe_video_with(
    program: impl AsRef<OsStr>,
    path: impl AsRef<Path>,
) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(MediaError::probe(format!(
            "Source file not found: {}",
            path.display()
        )));
    }

    let program = which::which(program.as_ref()).map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new(&program)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::Probe {
            message: format!("ffprobe could not read {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse the JSON document printed by ffprobe.
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::probe(format!("Unparseable ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| MediaError::probe("No video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(MediaError::probe("Video stream has no frame size")),
    };

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::probe("Container reports no duration"))?;

    Ok(VideoInfo {
        duration,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "programs": [],
            "streams": [{"width": 1920, "height": 1080}],
            "format": {"duration": "12.345000"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_missing_video_stream() {
        let json = br#"{"streams": [], "format": {"duration": "3.0"}}"#;
        let err = parse_probe_output(json).unwrap_err();
        assert!(matches!(err, MediaError::Probe { .. }));
    }

    #[test]
    fn test_missing_duration_or_size() {
        let json = br#"{"streams": [{"width": 640, "height": 480}], "format": {}}"#;
        assert!(parse_probe_output(json).is_err());

        let json = br#"{"streams": [{"width": 640}], "format": {"duration": "1.0"}}"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[test]
    fn test_garbage_output() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(MediaError::Probe { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_source_file() {
        let err = probe_video("/definitely/not/here.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::Probe { .. }));
        assert!(err.to_string().contains("Source file not found"));
    }

    #[tokio::test]
    async fn test_unknown_inspector_binary() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"fake").unwrap();

        let err = probe_video_with(dir.path().join("no-such-inspector"), &video)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FfprobeNotFound));
    }
}
