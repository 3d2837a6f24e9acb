//! Overlay filter graph construction.
//!
//! Overlays are layered onto the base video in a fixed order: every image
//! overlay, then every video overlay, then a single `drawtext` chain holding
//! all text overlays. Each stage consumes the previous stage's output label,
//! so the last label produced is the terminal video stream.
//!
//! Labels follow the pattern `[img{n}]`/`[v_img{n}]` for images,
//! `[vid{n}]`/`[v_vid{n}]` for clips and `[out]` for the text stage, where
//! `n` is the FFmpeg input index of the asset.

use std::fmt;
use std::path::{Path, PathBuf};

use ovl_models::{AssetOverlay, Overlay, OverlayKind, TextOverlay, TimeWindow};
use tracing::{debug, warn};

use crate::command::FfmpegCommand;
use crate::transform::{PixelRect, Transform};

/// Video stream of the uploaded source.
pub const BASE_VIDEO: &str = "0:v";

/// Audio selector for the source; the trailing `?` makes it optional.
pub const BASE_AUDIO: &str = "0:a?";

/// Color used for every text overlay.
pub const TEXT_COLOR: &str = "white";

/// Symbolic name of a stream inside the filter graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamLabel(String);

impl StreamLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Label of the `index`-th input's video stream.
    pub fn input_video(index: usize) -> Self {
        Self(format!("{}:v", index))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Escape text for a single-quoted `drawtext` value.
///
/// A quote closes the string, emits an escaped quote and reopens it.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\'', "'\\''")
}

fn enable_expr(window: &TimeWindow) -> String {
    format!("enable='between(t,{},{})'", window.start, window.end)
}

/// One `drawtext` instruction inside the combined text stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawText {
    pub text: String,
    pub x: i64,
    pub y: i64,
    pub font_size: i64,
    pub window: TimeWindow,
}

impl DrawText {
    fn render(&self) -> String {
        format!(
            "drawtext=text='{}':x={}:y={}:fontsize={}:fontcolor={}:{}",
            escape_drawtext(&self.text),
            self.x,
            self.y,
            self.font_size,
            TEXT_COLOR,
            enable_expr(&self.window)
        )
    }
}

/// A single composition step.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Resize an input; clips are additionally shifted to start at `pts_offset` seconds.
    Scale {
        input: StreamLabel,
        width: i64,
        height: i64,
        pts_offset: Option<f64>,
        output: StreamLabel,
    },
    /// Composite `top` onto `base` while the window is open.
    Overlay {
        base: StreamLabel,
        top: StreamLabel,
        x: i64,
        y: i64,
        window: TimeWindow,
        output: StreamLabel,
    },
    /// Draw every text overlay in one pass.
    DrawText {
        input: StreamLabel,
        items: Vec<DrawText>,
        output: StreamLabel,
    },
}

impl FilterOp {
    pub fn output(&self) -> &StreamLabel {
        match self {
            FilterOp::Scale { output, .. }
            | FilterOp::Overlay { output, .. }
            | FilterOp::DrawText { output, .. } => output,
        }
    }

    /// Render as a filtergraph chain.
    pub fn render(&self) -> String {
        match self {
            FilterOp::Scale {
                input,
                width,
                height,
                pts_offset,
                output,
            } => match pts_offset {
                Some(start) => format!(
                    "{}scale={}:{},setpts=PTS-STARTPTS+{}/TB{}",
                    input, width, height, start, output
                ),
                None => format!("{}scale={}:{}{}", input, width, height, output),
            },
            FilterOp::Overlay {
                base,
                top,
                x,
                y,
                window,
                output,
            } => format!(
                "{}{}overlay=x={}:y={}:{}{}",
                base,
                top,
                x,
                y,
                enable_expr(window),
                output
            ),
            FilterOp::DrawText {
                input,
                items,
                output,
            } => {
                let chain: Vec<String> = items.iter().map(DrawText::render).collect();
                format!("{}{}{}", input, chain.join(","), output)
            }
        }
    }
}

/// An executable composition: extra inputs, ordered steps and the terminal label.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    /// Asset inputs; entry `i` is FFmpeg input `i + 1`
    pub inputs: Vec<PathBuf>,
    pub ops: Vec<FilterOp>,
    pub output: StreamLabel,
}

impl FilterGraph {
    /// Serialize as a `-filter_complex` expression.
    pub fn filter_complex(&self) -> String {
        self.ops
            .iter()
            .map(FilterOp::render)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Build the FFmpeg invocation that renders this graph.
    pub fn to_command(
        &self,
        source: impl AsRef<Path>,
        output: impl AsRef<Path>,
        video_codec: &str,
        audio_codec: &str,
    ) -> FfmpegCommand {
        let cmd = self
            .inputs
            .iter()
            .fold(FfmpegCommand::new(source, output), |cmd, input| cmd.input(input));

        cmd.filter_complex(self.filter_complex())
            .map(self.output.to_string())
            .map(BASE_AUDIO)
            .video_codec(video_codec)
            .audio_codec(audio_codec)
    }
}

/// Result of planning a job.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionPlan {
    /// Nothing to draw; the source is copied as-is.
    CopyOnly,
    Graph(FilterGraph),
}

impl CompositionPlan {
    pub fn is_copy_only(&self) -> bool {
        matches!(self, CompositionPlan::CopyOnly)
    }
}

/// An overlay left out of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOverlay {
    pub kind: OverlayKind,
    pub content: String,
    pub reason: String,
}

/// Builds a [`CompositionPlan`] for one job.
pub struct FilterGraphBuilder<'a> {
    transform: Transform,
    duration: f64,
    asset_dir: &'a Path,
    inputs: Vec<PathBuf>,
    ops: Vec<FilterOp>,
    current: StreamLabel,
    skipped: Vec<SkippedOverlay>,
}

impl<'a> FilterGraphBuilder<'a> {
    pub fn new(transform: Transform, duration: f64, asset_dir: &'a Path) -> Self {
        Self {
            transform,
            duration,
            asset_dir,
            inputs: Vec::new(),
            ops: Vec::new(),
            current: StreamLabel::new(BASE_VIDEO),
            skipped: Vec::new(),
        }
    }

    /// Overlays that were dropped during the last [`build`](Self::build).
    pub fn skipped(&self) -> &[SkippedOverlay] {
        &self.skipped
    }

    /// Plan the composition of `overlays` over the base video.
    ///
    /// Each call starts from the base video stream, so a builder can be reused.
    pub fn build(&mut self, overlays: &[Overlay]) -> CompositionPlan {
        self.inputs.clear();
        self.ops.clear();
        self.skipped.clear();
        self.current = StreamLabel::new(BASE_VIDEO);

        let mut images = Vec::new();
        let mut videos = Vec::new();
        let mut texts = Vec::new();
        for overlay in overlays {
            match overlay {
                Overlay::Image(a) => images.push((overlay, a)),
                Overlay::Video(a) => videos.push((overlay, a)),
                Overlay::Text(t) => texts.push((overlay, t)),
            }
        }

        if images.is_empty() && videos.is_empty() && texts.is_empty() {
            return CompositionPlan::CopyOnly;
        }

        for (overlay, asset) in images {
            self.push_asset(overlay, asset, false);
        }
        for (overlay, asset) in videos {
            self.push_asset(overlay, asset, true);
        }
        if !texts.is_empty() {
            self.push_texts(&texts);
        }

        if self.ops.is_empty() {
            debug!("All overlays skipped, falling back to copy");
            return CompositionPlan::CopyOnly;
        }

        CompositionPlan::Graph(FilterGraph {
            inputs: std::mem::take(&mut self.inputs),
            ops: std::mem::take(&mut self.ops),
            output: self.current.clone(),
        })
    }

    fn skip(&mut self, kind: OverlayKind, content: &str, reason: String) {
        warn!(kind = kind.as_str(), content = %content, "Skipping overlay: {}", reason);
        self.skipped.push(SkippedOverlay {
            kind,
            content: content.to_string(),
            reason,
        });
    }

    fn resolve_asset(&self, asset: &AssetOverlay) -> Result<PathBuf, String> {
        let name = asset
            .asset_file_name()
            .ok_or_else(|| format!("invalid asset reference '{}'", asset.content))?;
        let path = self.asset_dir.join(name);
        if !path.is_file() {
            return Err(format!("asset not found: {}", path.display()));
        }
        Ok(path)
    }

    fn push_asset(&mut self, overlay: &Overlay, asset: &AssetOverlay, is_clip: bool) {
        let kind = overlay.kind();
        let path = match self.resolve_asset(asset) {
            Ok(path) => path,
            Err(reason) => return self.skip(kind, &asset.content, reason),
        };

        let rect: PixelRect =
            self.transform
                .map_rect(asset.x, asset.y, asset.width, asset.height, asset.scale);
        if rect.width <= 0 || rect.height <= 0 {
            return self.skip(
                kind,
                &asset.content,
                format!("maps to an empty {}x{} rectangle", rect.width, rect.height),
            );
        }

        self.inputs.push(path);
        let index = self.inputs.len();
        let window = overlay.window(self.duration);
        let (scaled, composed) = if is_clip {
            (format!("vid{}", index), format!("v_vid{}", index))
        } else {
            (format!("img{}", index), format!("v_img{}", index))
        };

        let scaled = StreamLabel::new(scaled);
        let composed = StreamLabel::new(composed);

        self.ops.push(FilterOp::Scale {
            input: StreamLabel::input_video(index),
            width: rect.width,
            height: rect.height,
            pts_offset: is_clip.then_some(window.start),
            output: scaled.clone(),
        });
        self.ops.push(FilterOp::Overlay {
            base: self.current.clone(),
            top: scaled,
            x: rect.x,
            y: rect.y,
            window,
            output: composed.clone(),
        });
        self.current = composed;
    }

    fn push_texts(&mut self, texts: &[(&Overlay, &TextOverlay)]) {
        let items = texts
            .iter()
            .map(|(overlay, text)| {
                let (x, y) = self.transform.map_text_origin(text.x, text.y);
                DrawText {
                    text: text.content.clone(),
                    x,
                    y,
                    font_size: self.transform.map_font_size(text.font_size()),
                    window: overlay.window(self.duration),
                }
            })
            .collect();

        let output = StreamLabel::new("out");
        self.ops.push(FilterOp::DrawText {
            input: self.current.clone(),
            items,
            output: output.clone(),
        });
        self.current = output;
    }
}

/// Plan the composition of `overlays` for a source described by `transform`.
pub fn build_plan(
    overlays: &[Overlay],
    transform: Transform,
    duration: f64,
    asset_dir: &Path,
) -> CompositionPlan {
    FilterGraphBuilder::new(transform, duration, asset_dir).build(overlays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovl_models::parse_overlays;
    use tempfile::TempDir;

    fn transform() -> Transform {
        Transform::compute(960.0, 540.0, 1920.0, 1080.0).unwrap()
    }

    fn asset_dir(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in files {
            std::fs::write(dir.path().join(name), b"asset").unwrap();
        }
        dir
    }

    fn graph(plan: CompositionPlan) -> FilterGraph {
        match plan {
            CompositionPlan::Graph(g) => g,
            CompositionPlan::CopyOnly => panic!("expected a filter graph"),
        }
    }

    #[test]
    fn test_empty_overlay_list_is_copy_only() {
        let dir = asset_dir(&[]);
        assert!(build_plan(&[], transform(), 10.0, dir.path()).is_copy_only());
    }

    #[test]
    fn test_single_text_overlay() {
        let dir = asset_dir(&[]);
        let overlays = parse_overlays(
            r#"[{"type": "text", "content": "Hi", "start_time": 0, "end_time": 5, "x": 100, "y": 100}]"#,
        )
        .unwrap();

        let g = graph(build_plan(&overlays, transform(), 10.0, dir.path()));
        assert!(g.inputs.is_empty());
        assert_eq!(g.output.name(), "out");
        assert_eq!(
            g.filter_complex(),
            "[0:v]drawtext=text='Hi':x=220:y=220:fontsize=70:fontcolor=white:enable='between(t,0,5)'[out]"
        );
    }

    #[test]
    fn test_image_overlay_chain() {
        let dir = asset_dir(&["logo.png"]);
        let overlays = parse_overlays(
            r#"[{"type": "image", "content": "file:///phone/cache/logo.png",
                 "start_time": 1.5, "end_time": 3, "x": 10, "y": 20, "width": 50, "height": 40, "scale": 2}]"#,
        )
        .unwrap();

        let g = graph(build_plan(&overlays, transform(), 10.0, dir.path()));
        assert_eq!(g.inputs, vec![dir.path().join("logo.png")]);
        assert_eq!(g.output.name(), "v_img1");
        assert_eq!(
            g.filter_complex(),
            "[1:v]scale=200:160[img1];\
             [0:v][img1]overlay=x=20:y=40:enable='between(t,1.5,3)'[v_img1]"
        );
    }

    #[test]
    fn test_video_overlay_rebases_timestamps() {
        let dir = asset_dir(&["clip.mp4"]);
        let overlays = parse_overlays(
            r#"[{"type": "video", "content": "clip.mp4", "start_time": 2, "end_time": 4, "x": 0, "y": 0}]"#,
        )
        .unwrap();

        let g = graph(build_plan(&overlays, transform(), 10.0, dir.path()));
        assert_eq!(
            g.ops[0].render(),
            "[1:v]scale=200:200,setpts=PTS-STARTPTS+2/TB[vid1]"
        );
        assert_eq!(
            g.ops[1].render(),
            "[0:v][vid1]overlay=x=0:y=0:enable='between(t,2,4)'[v_vid1]"
        );
    }

    #[test]
    fn test_layer_order_images_then_videos_then_text() {
        let dir = asset_dir(&["a.png", "b.mp4", "c.png"]);
        let overlays = parse_overlays(
            r#"[
                {"type": "text", "content": "first", "x": 0, "y": 0},
                {"type": "video", "content": "b.mp4"},
                {"type": "image", "content": "a.png"},
                {"type": "text", "content": "second", "x": 5, "y": 5},
                {"type": "image", "content": "c.png"}
            ]"#,
        )
        .unwrap();

        let g = graph(build_plan(&overlays, transform(), 8.0, dir.path()));
        assert_eq!(
            g.inputs,
            vec![
                dir.path().join("a.png"),
                dir.path().join("c.png"),
                dir.path().join("b.mp4"),
            ]
        );

        let outputs: Vec<&str> = g.ops.iter().map(|op| op.output().name()).collect();
        assert_eq!(
            outputs,
            vec!["img1", "v_img1", "img2", "v_img2", "vid3", "v_vid3", "out"]
        );

        match &g.ops[1] {
            FilterOp::Overlay { base, .. } => assert_eq!(base.name(), "0:v"),
            other => panic!("unexpected op {:?}", other),
        }
        match &g.ops[3] {
            FilterOp::Overlay { base, .. } => assert_eq!(base.name(), "v_img1"),
            other => panic!("unexpected op {:?}", other),
        }
        match g.ops.last().unwrap() {
            FilterOp::DrawText { input, items, .. } => {
                assert_eq!(input.name(), "v_vid3");
                let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
                assert_eq!(texts, vec!["first", "second"]);
                assert_eq!(items[0].window, TimeWindow { start: 0.0, end: 8.0 });
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_missing_asset_is_skipped() {
        let dir = asset_dir(&["present.png"]);
        let overlays = parse_overlays(
            r#"[
                {"type": "image", "content": "missing.png"},
                {"type": "image", "content": "present.png"}
            ]"#,
        )
        .unwrap();

        let mut builder = FilterGraphBuilder::new(transform(), 10.0, dir.path());
        let g = graph(builder.build(&overlays));
        assert_eq!(builder.skipped().len(), 1);
        assert_eq!(builder.skipped()[0].content, "missing.png");

        // Input indices stay dense after a skip
        assert_eq!(g.inputs.len(), 1);
        assert_eq!(g.output.name(), "v_img1");
    }

    #[test]
    fn test_only_missing_assets_is_copy_only() {
        let dir = asset_dir(&[]);
        let overlays = parse_overlays(
            r#"[{"type": "video", "content": "gone.mp4"}, {"type": "image", "content": "gone.png"}]"#,
        )
        .unwrap();

        let mut builder = FilterGraphBuilder::new(transform(), 10.0, dir.path());
        assert!(builder.build(&overlays).is_copy_only());
        assert_eq!(builder.skipped().len(), 2);
    }

    #[test]
    fn test_builder_reuse_starts_from_base_video() {
        let dir = asset_dir(&["logo.png"]);
        let overlays = parse_overlays(
            r#"[
                {"type": "image", "content": "logo.png"},
                {"type": "image", "content": "absent.png"},
                {"type": "text", "content": "Hi", "x": 0, "y": 0}
            ]"#,
        )
        .unwrap();

        let mut builder = FilterGraphBuilder::new(transform(), 10.0, dir.path());
        let first = graph(builder.build(&overlays));
        let second = graph(builder.build(&overlays));

        assert_eq!(first, second);
        assert!(second.filter_complex().starts_with("[1:v]scale"));
        assert_eq!(second.inputs, vec![dir.path().join("logo.png")]);
        assert_eq!(builder.skipped().len(), 1);

        let text_only = parse_overlays(r#"[{"type": "text", "content": "Hi", "x": 0, "y": 0}]"#).unwrap();
        let third = graph(builder.build(&text_only));
        assert!(third.filter_complex().starts_with("[0:v]drawtext"));
        assert!(third.inputs.is_empty());
        assert!(builder.skipped().is_empty());
    }

    #[test]
    fn test_degenerate_size_is_skipped() {
        let dir = asset_dir(&["dot.png"]);
        let overlays =
            parse_overlays(r#"[{"type": "image", "content": "dot.png", "width": 0.1, "height": 10}]"#)
                .unwrap();
        assert!(build_plan(&overlays, transform(), 10.0, dir.path()).is_copy_only());
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(escape_drawtext("it's"), "it'\\''s");
        assert_eq!(escape_drawtext("plain"), "plain");

        let item = DrawText {
            text: "don't".to_string(),
            x: 1,
            y: 2,
            font_size: 3,
            window: TimeWindow { start: 0.0, end: 1.0 },
        };
        assert_eq!(
            item.render(),
            "drawtext=text='don'\\''t':x=1:y=2:fontsize=3:fontcolor=white:enable='between(t,0,1)'"
        );
    }

    #[test]
    fn test_to_command_maps_terminal_and_optional_audio() {
        let dir = asset_dir(&["logo.png"]);
        let overlays = parse_overlays(r#"[{"type": "image", "content": "logo.png"}]"#).unwrap();
        let g = graph(build_plan(&overlays, transform(), 10.0, dir.path()));

        let args = g
            .to_command("input.mp4", "out.mp4", "libx264", "aac")
            .build_args();

        let maps: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-map")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(maps, vec!["[v_img1]", "0:a?"]);
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 2);
    }
}
