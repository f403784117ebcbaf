//! rangefinder-export: Pure overlay renderers (sans-IO)
//!
//! Turns a [`FrameOutput`] into something a person can look at: an
//! annotated SVG document ([`to_svg`]) or the raw frame with the same
//! markers stroked onto it ([`render_overlay`]). Nothing here touches
//! the filesystem; callers decide where the bytes go.
//!
//! Both renderers share one palette:
//!
//! | Marker | Color |
//! |---|---|
//! | every extracted contour | green |
//! | rotated rectangle (above the box floor) | blue |
//! | enclosing circle (above the radius floor) | red |
//! | selected object's bounding box and label | yellow |

pub mod raster;
pub mod svg;

use rangefinder_pipeline::{Detection, GridPoint, Point};

pub use raster::render_overlay;
pub use svg::{SvgMetadata, build_path_data, to_svg};

/// RGB color of every extracted contour.
pub const CONTOUR_COLOR: [u8; 3] = [0, 255, 0];
/// RGB color of rotated bounding rectangles.
pub const BOX_COLOR: [u8; 3] = [0, 0, 255];
/// RGB color of enclosing circles.
pub const CIRCLE_COLOR: [u8; 3] = [255, 0, 0];
/// RGB color of the selected object's bounding box and label.
pub const DETECTION_COLOR: [u8; 3] = [255, 255, 0];
/// Stroke width of every marker, in pixels.
pub const STROKE_WIDTH: f32 = 2.0;

/// Errors from the overlay renderers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The frame has no pixels to draw on.
    #[error("cannot render a {width}x{height} overlay")]
    EmptyFrame {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
    },
}

/// Text label for a detection: the shape name, plus the distance when
/// one was estimated.
///
/// ```
/// # use rangefinder_pipeline::{PipelineConfig, RgbImage, process_frame};
/// let output = process_frame(RgbImage::new(8, 8), &PipelineConfig::default());
/// if let Some(detection) = &output.detection {
///     assert!(rangefinder_export::detection_label(detection).starts_with("Rectangle"));
/// }
/// ```
#[must_use]
pub fn detection_label(detection: &Detection) -> String {
    detection.distance.map_or_else(
        || detection.shape.to_string(),
        |distance| format!("{} {distance:.2}", detection.shape),
    )
}

/// Overlay coordinates of a pixel: its center, not its top-left corner.
fn pixel_center(p: GridPoint) -> Point {
    Point::new(f64::from(p.x) + 0.5, f64::from(p.y) + 0.5)
}

/// Shift a derived sub-pixel point into overlay coordinates.
fn shifted(p: Point) -> Point {
    Point::new(p.x + 0.5, p.y + 0.5)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rangefinder_pipeline::{
        ChannelBounds, DenoiseFilter, PipelineConfig, RgbImage, ShapeClass, process_frame,
    };

    use super::*;

    #[test]
    fn label_includes_distance_when_present() {
        let frame = RgbImage::from_fn(200, 200, |x, y| {
            if (50..150).contains(&x) && (50..150).contains(&y) {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        let mut config = PipelineConfig {
            denoise: DenoiseFilter::Disabled,
            hsv_smoothing: false,
            ..PipelineConfig::default()
        };
        config.segmentation.value = ChannelBounds::new(128, 255);
        let mut detection = process_frame(frame, &config).detection.unwrap();
        assert_eq!(detection.shape, ShapeClass::Rectangle);
        assert_eq!(detection_label(&detection), "Rectangle 19.95");

        detection.distance = None;
        assert_eq!(detection_label(&detection), "Rectangle");
    }

    #[test]
    fn pixel_centers_are_offset_by_half() {
        assert_eq!(pixel_center(GridPoint::new(3, 4)), Point::new(3.5, 4.5));
        assert_eq!(shifted(Point::new(1.25, 0.0)), Point::new(1.75, 0.5));
    }
}
