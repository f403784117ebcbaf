//! Shared types for the rangefinder pipeline.

use serde::{Deserialize, Serialize};

use crate::classify::ShapeClass;
use crate::geometry::{BoundingGeometry, EnclosingCircle, RotatedRect};

/// Re-export `GrayImage` so downstream crates can reference masks
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference frames
/// without depending on `image` directly.
pub use image::RgbImage;

/// A 2D point in image coordinates with sub-pixel precision.
///
/// Used for derived geometry (circle centers, rotated rectangle
/// corners). Traced boundaries use [`GridPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl From<GridPoint> for Point {
    fn from(p: GridPoint) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

/// An integer pixel coordinate on a traced boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPoint {
    /// Create a new grid point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<GridPoint> for imageproc::point::Point<i32> {
    fn from(p: GridPoint) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<imageproc::point::Point<i32>> for GridPoint {
    fn from(p: imageproc::point::Point<i32>) -> Self {
        Self::new(p.x, p.y)
    }
}

/// The closed outer boundary of one connected foreground region.
///
/// Always holds at least one point; the last point connects back to
/// the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<GridPoint>);

#[allow(clippy::len_without_is_empty)]
impl Contour {
    /// Create a contour, returning `None` when `points` is empty.
    #[must_use]
    pub fn new(points: Vec<GridPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self(points))
        }
    }

    /// Number of boundary points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[GridPoint] {
        &self.0
    }

    /// Consumes the contour and returns the underlying points.
    #[must_use]
    pub fn into_points(self) -> Vec<GridPoint> {
        self.0
    }

    /// Enclosed area by the shoelace formula.
    ///
    /// Orientation-independent. Contours with fewer than three points
    /// enclose nothing and return `0.0`.
    #[must_use]
    pub fn area(&self) -> f64 {
        imageproc::geometry::contour_area(&self.to_imageproc())
    }

    /// Length of the closed boundary, including the closing segment.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        imageproc::geometry::arc_length(&self.to_imageproc(), true)
    }

    /// The points in `imageproc`'s point type.
    pub(crate) fn to_imageproc(&self) -> Vec<imageproc::point::Point<i32>> {
        self.0.iter().copied().map(Into::into).collect()
    }
}

/// A reduced closed polygon approximating a [`Contour`].
///
/// Vertices are a subset of the contour's points, in contour order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonApproximation(Vec<GridPoint>);

impl PolygonApproximation {
    /// Wrap an ordered vertex list.
    #[must_use]
    pub const fn new(vertices: Vec<GridPoint>) -> Self {
        Self(vertices)
    }

    /// Number of polygon vertices; the only input to shape classification.
    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of the vertices.
    #[must_use]
    pub fn vertices(&self) -> &[GridPoint] {
        &self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// The selected object of interest for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index of the selected contour within [`FrameOutput::contours`].
    pub contour_index: usize,
    /// The selected contour.
    pub contour: Contour,
    /// Enclosed area of the selected contour in square pixels.
    pub area: f64,
    /// Perimeter-tolerance polygon used for classification.
    pub approximation: PolygonApproximation,
    /// Classification by approximation vertex count.
    pub shape: ShapeClass,
    /// Axis-aligned box, rotated box, and enclosing circle.
    pub geometry: BoundingGeometry,
    /// Apparent width in pixels used for ranging, when the shape has one.
    pub pixel_width: Option<f64>,
    /// Estimated physical distance, in the reference width's units.
    ///
    /// `None` for [`ShapeClass::Undefined`], for degenerate (zero)
    /// widths, and when distance estimation is switched off.
    pub distance: Option<f64>,
}

/// Overlay geometry for one extracted contour.
///
/// Each marker carries its own draw flag, decided by the configured
/// size floors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourAnnotation {
    /// Index of the contour within [`FrameOutput::contours`].
    pub contour_index: usize,
    /// Minimum-area rotated rectangle.
    pub rotated_rect: RotatedRect,
    /// Minimum enclosing circle.
    pub enclosing_circle: EnclosingCircle,
    /// Whether the bounding-rect area reached the box floor.
    pub draw_box: bool,
    /// Whether the circle radius reached the radius floor.
    pub draw_circle: bool,
}

/// Everything one tick of the pipeline produced.
///
/// Handed to the renderer; nothing in it is retained across ticks.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// The raw frame as captured.
    pub frame: RgbImage,
    /// The frame converted to HSV (channels hold H, S, V).
    pub hsv: RgbImage,
    /// The refined mask, for display.
    pub mask: GrayImage,
    /// All extracted contours.
    pub contours: Vec<Contour>,
    /// The selected object, if any contour qualified.
    pub detection: Option<Detection>,
    /// Per-contour overlay markers (empty unless enabled).
    pub annotations: Vec<ContourAnnotation>,
    /// Frame dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur in the pipeline crate.
///
/// Per-frame processing itself never fails: out-of-range configuration
/// is coerced and degenerate measurements yield `None`. These errors
/// come from decoding frames and from offline calibration.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode an input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Calibration inputs cannot produce a finite, positive constant.
    #[error("invalid calibration input: {0}")]
    InvalidCalibration(String),
}
