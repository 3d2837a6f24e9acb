//! Container-space to source-pixel mapping.
//!
//! The editor shows the video "contained" in its preview box: scaled to fit
//! while preserving aspect ratio, centered, with padding on one axis. Overlay
//! geometry arrives relative to that box, so every coordinate has the padding
//! removed and is then scaled by the ratio between source pixels and preview
//! pixels.
//!
//! Pixel values are truncated toward zero.

use serde::Serialize;

use crate::error::{MediaError, MediaResult};

/// Container-space padding added to text positions before mapping.
pub const TEXT_PADDING: f64 = 10.0;

/// Letterbox/pillarbox fit of the video inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    /// Width of the displayed video in container units
    pub display_width: f64,
    /// Height of the displayed video in container units
    pub display_height: f64,
    /// Horizontal padding on each side (pillarbox)
    pub offset_x: f64,
    /// Vertical padding on each side (letterbox)
    pub offset_y: f64,
    /// Source pixels per container unit
    pub scale_factor: f64,
}

/// Rectangle in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

fn check_dimension(name: &str, value: f64) -> MediaResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MediaError::invalid_dimensions(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

impl Transform {
    /// Compute the fit of a `video_w`x`video_h` frame inside the container.
    pub fn compute(
        container_w: f64,
        container_h: f64,
        video_w: f64,
        video_h: f64,
    ) -> MediaResult<Self> {
        check_dimension("container width", container_w)?;
        check_dimension("container height", container_h)?;
        check_dimension("video width", video_w)?;
        check_dimension("video height", video_h)?;

        let video_aspect = video_w / video_h;
        let container_aspect = container_w / container_h;

        let transform = if container_aspect > video_aspect {
            // Height-constrained: bars left and right
            let display_height = container_h;
            let display_width = container_h * video_aspect;
            Self {
                display_width,
                display_height,
                offset_x: (container_w - display_width) / 2.0,
                offset_y: 0.0,
                scale_factor: video_w / display_width,
            }
        } else {
            // Width-constrained: bars top and bottom
            let display_width = container_w;
            let display_height = container_w / video_aspect;
            Self {
                display_width,
                display_height,
                offset_x: 0.0,
                offset_y: (container_h - display_height) / 2.0,
                scale_factor: video_w / display_width,
            }
        };

        Ok(transform)
    }

    /// Map a container-space point to source pixels.
    pub fn map_point(&self, x: f64, y: f64) -> (i64, i64) {
        (
            ((x - self.offset_x) * self.scale_factor) as i64,
            ((y - self.offset_y) * self.scale_factor) as i64,
        )
    }

    /// Map an image/video overlay box, applying its uniform scale to the size.
    pub fn map_rect(&self, x: f64, y: f64, width: f64, height: f64, scale: f64) -> PixelRect {
        let (px, py) = self.map_point(x, y);
        PixelRect {
            x: px,
            y: py,
            width: (width * scale * self.scale_factor) as i64,
            height: (height * scale * self.scale_factor) as i64,
        }
    }

    /// Map the origin of a text overlay, which carries a fixed padding.
    pub fn map_text_origin(&self, x: f64, y: f64) -> (i64, i64) {
        self.map_point(x + TEXT_PADDING, y + TEXT_PADDING)
    }

    /// Scale a container-space font size to source pixels.
    pub fn map_font_size(&self, font_size: f64) -> i64 {
        (font_size * self.scale_factor) as i64
    }

    /// Map a source-pixel point back into container space.
    pub fn unmap_point(&self, px: f64, py: f64) -> (f64, f64) {
        (
            px / self.scale_factor + self.offset_x,
            py / self.scale_factor + self.offset_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMENSIONS: &[(f64, f64, f64, f64)] = &[
        (960.0, 540.0, 1920.0, 1080.0),
        (400.0, 600.0, 1920.0, 1080.0),
        (1000.0, 300.0, 1280.0, 720.0),
        (360.0, 640.0, 1080.0, 1920.0),
        (640.0, 640.0, 720.0, 1280.0),
        (333.0, 777.0, 640.0, 480.0),
        (1234.5, 321.25, 3840.0, 2160.0),
        (500.0, 500.0, 500.0, 500.0),
    ];

    #[test]
    fn test_same_aspect_has_no_padding() {
        let t = Transform::compute(960.0, 540.0, 1920.0, 1080.0).unwrap();
        assert_eq!(t.display_width, 960.0);
        assert_eq!(t.display_height, 540.0);
        assert_eq!(t.offset_x, 0.0);
        assert_eq!(t.offset_y, 0.0);
        assert_eq!(t.scale_factor, 2.0);
    }

    #[test]
    fn test_wide_container_pillarboxes() {
        // 16:9 container holding a 4:3 video
        let t = Transform::compute(1600.0, 900.0, 640.0, 480.0).unwrap();
        assert_eq!(t.display_height, 900.0);
        assert_eq!(t.display_width, 1200.0);
        assert_eq!(t.offset_x, 200.0);
        assert_eq!(t.offset_y, 0.0);
        assert!((t.scale_factor - 640.0 / 1200.0).abs() < 1e-12);
    }

    #[test]
    fn test_tall_container_letterboxes() {
        let t = Transform::compute(400.0, 600.0, 1920.0, 1080.0).unwrap();
        assert_eq!(t.display_width, 400.0);
        assert_eq!(t.display_height, 225.0);
        assert_eq!(t.offset_x, 0.0);
        assert_eq!(t.offset_y, 187.5);
        assert_eq!(t.scale_factor, 4.8);
    }

    #[test]
    fn test_fit_properties_hold_for_all_pairs() {
        for &(cw, ch, vw, vh) in DIMENSIONS {
            let t = Transform::compute(cw, ch, vw, vh).unwrap();
            if cw / ch > vw / vh {
                assert_eq!(t.display_height, ch, "{:?}", (cw, ch, vw, vh));
                assert!(t.display_width <= cw);
            } else {
                assert_eq!(t.display_width, cw, "{:?}", (cw, ch, vw, vh));
                assert!(t.display_height <= ch + 1e-9);
            }
            assert!(t.offset_x >= 0.0 && t.offset_y >= 0.0);
        }
    }

    #[test]
    fn test_container_center_maps_to_video_center() {
        for &(cw, ch, vw, vh) in DIMENSIONS {
            let t = Transform::compute(cw, ch, vw, vh).unwrap();
            let (px, py) = t.map_point(cw / 2.0, ch / 2.0);
            assert!((px as f64 - vw / 2.0).abs() <= 1.0, "{:?} -> {}", (cw, ch, vw, vh), px);
            assert!((py as f64 - vh / 2.0).abs() <= 1.0, "{:?} -> {}", (cw, ch, vw, vh), py);

            let (cx, cy) = t.unmap_point(vw / 2.0, vh / 2.0);
            assert!((cx - cw / 2.0).abs() < 1e-6);
            assert!((cy - ch / 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rect_mapping_truncates() {
        let t = Transform::compute(960.0, 540.0, 1920.0, 1080.0).unwrap();
        let rect = t.map_rect(100.3, 50.0, 80.0, 45.0, 1.5);
        assert_eq!(
            rect,
            PixelRect {
                x: 200,
                y: 100,
                width: 240,
                height: 135,
            }
        );

        let t = Transform::compute(300.0, 300.0, 100.0, 100.0).unwrap();
        let rect = t.map_rect(10.0, 10.0, 10.0, 10.0, 1.0);
        assert_eq!(rect.x, 3);
        assert_eq!(rect.width, 3);
    }

    #[test]
    fn test_overlay_inside_padding_maps_negative() {
        let t = Transform::compute(1600.0, 900.0, 640.0, 480.0).unwrap();
        let (px, _) = t.map_point(100.0, 0.0);
        assert!(px < 0);
    }

    #[test]
    fn test_text_mapping() {
        let t = Transform::compute(960.0, 540.0, 1920.0, 1080.0).unwrap();
        assert_eq!(t.map_text_origin(100.0, 100.0), (220, 220));
        assert_eq!(t.map_font_size(35.0), 70);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        for (cw, ch, vw, vh) in [
            (960.0, 0.0, 1920.0, 1080.0),
            (960.0, 540.0, 1920.0, 0.0),
            (0.0, 540.0, 1920.0, 1080.0),
            (960.0, 540.0, 0.0, 1080.0),
            (-1.0, 540.0, 1920.0, 1080.0),
            (f64::NAN, 540.0, 1920.0, 1080.0),
        ] {
            let err = Transform::compute(cw, ch, vw, vh).unwrap_err();
            assert!(matches!(err, MediaError::InvalidDimensions(_)));
        }
    }
}
