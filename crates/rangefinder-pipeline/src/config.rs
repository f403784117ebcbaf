//! Live pipeline configuration.
//!
//! A [`PipelineConfig`] is owned by whatever control surface drives the
//! run (sliders, a watched JSON file, a test) and is passed by reference
//! into every tick. The pipeline only reads it. Out-of-range values are
//! not rejected here; each stage coerces the values it reads at the
//! point of use (see [`crate::morphology::coerce_kernel_extent`] and
//! [`SegmentationRange::clamped`]).
//!
//! Every struct uses `#[serde(default)]` so partial JSON documents
//! fill in the remaining fields from the defaults.

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;

/// An inclusive `[low, high]` interval on one color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBounds {
    /// Lowest accepted value.
    pub low: u8,
    /// Highest accepted value.
    pub high: u8,
}

impl ChannelBounds {
    /// Create a new interval.
    #[must_use]
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    /// Whether `value` lies within the interval, bounds included.
    ///
    /// An inverted interval (`low > high`) accepts nothing.
    #[must_use]
    pub const fn contains(self, value: u8) -> bool {
        value >= self.low && value <= self.high
    }
}

/// The color window accepted by segmentation, in 8-bit HSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationRange {
    /// Hue bounds (0–179, degrees halved).
    pub hue: ChannelBounds,
    /// Saturation bounds (0–255).
    pub saturation: ChannelBounds,
    /// Value bounds (0–255).
    pub value: ChannelBounds,
}

impl SegmentationRange {
    /// Largest hue an 8-bit HSV pixel can hold.
    pub const HUE_MAX: u8 = 179;

    /// Copy of the range with hue bounds clamped to [`Self::HUE_MAX`].
    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |v: u8| v.min(Self::HUE_MAX);
        Self {
            hue: ChannelBounds::new(clamp(self.hue.low), clamp(self.hue.high)),
            ..self
        }
    }

    /// Whether an `[h, s, v]` pixel lies inside all three intervals.
    #[must_use]
    pub const fn contains(&self, hsv: [u8; 3]) -> bool {
        self.hue.contains(hsv[0]) && self.saturation.contains(hsv[1]) && self.value.contains(hsv[2])
    }
}

impl Default for SegmentationRange {
    /// Accept every pixel.
    fn default() -> Self {
        Self {
            hue: ChannelBounds::new(0, Self::HUE_MAX),
            saturation: ChannelBounds::new(0, 255),
            value: ChannelBounds::new(0, 255),
        }
    }
}

/// Noise filter applied to the raw frame before color conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoiseFilter {
    /// 3×3 median filter. Removes salt-and-pepper speckle without
    /// shifting edges.
    #[default]
    Median,
    /// 3×3 box (mean) filter.
    Box,
    /// Use the raw frame unchanged.
    Disabled,
}

/// Shape of the morphological structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementShape {
    /// Plus sign: the anchor row and column.
    #[default]
    Cross,
    /// Every cell of the element.
    Rectangle,
    /// Ellipse inscribed in the element.
    Ellipse,
}

/// Parameters of the morphological refiner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Structuring element shape.
    pub shape: ElementShape,
    /// Structuring element width. Zero is treated as one.
    pub element_width: u32,
    /// Structuring element height. Zero is treated as one.
    pub element_height: u32,
    /// Gaussian kernel width. Coerced to an odd value at least one.
    pub kernel_x: u32,
    /// Gaussian kernel height. Coerced to an odd value at least one.
    pub kernel_y: u32,
    /// Largest Gaussian kernel extent the control surface offers.
    pub kernel_max: u32,
    /// Gaussian sigma along x. Non-positive derives it from `kernel_x`.
    pub sigma_x: f32,
    /// Gaussian sigma along y. Non-positive inherits `sigma_x`.
    pub sigma_y: f32,
    /// Erode/dilate iterations for opening and closing. Zero skips both.
    pub passes: u32,
}

impl MorphologyConfig {
    /// Default largest Gaussian kernel extent.
    pub const DEFAULT_KERNEL_MAX: u32 = 31;
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            shape: ElementShape::default(),
            element_width: 0,
            element_height: 0,
            kernel_x: 1,
            kernel_y: 1,
            kernel_max: Self::DEFAULT_KERNEL_MAX,
            sigma_x: 0.0,
            sigma_y: 0.0,
            passes: 0,
        }
    }
}

/// Which mask the contour extractor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourSource {
    /// The mask as thresholded, before smoothing and morphology.
    /// Refinement then only affects the displayed mask.
    #[default]
    Unrefined,
    /// The refined mask that is also displayed.
    Refined,
}

/// Object-of-interest selection and classification parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// The largest contour is selected only if its area exceeds this.
    pub min_area: f64,
    /// Polygon approximation tolerance as a fraction of the perimeter.
    pub approximation_fraction: f64,
}

impl SelectionConfig {
    /// Default area floor: any region enclosing more than one pixel.
    pub const DEFAULT_MIN_AREA: f64 = 1.0;
    /// Default approximation tolerance: 1% of the perimeter.
    pub const DEFAULT_APPROXIMATION_FRACTION: f64 = 0.01;
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_area: Self::DEFAULT_MIN_AREA,
            approximation_fraction: Self::DEFAULT_APPROXIMATION_FRACTION,
        }
    }
}

/// Calibration for the pinhole distance model.
///
/// Loaded once at startup; recalibrating means loading a new value,
/// not rebuilding the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Focal-length equivalent in pixels, from
    /// [`crate::range::calibrate`].
    pub calibration_constant: f64,
    /// Physical width of the reference object. Distances come out in
    /// the same unit.
    pub reference_width: f64,
}

impl RangeConfig {
    /// Default focal-length equivalent.
    pub const DEFAULT_CALIBRATION_CONSTANT: f64 = 570.0;
    /// Default reference object width.
    pub const DEFAULT_REFERENCE_WIDTH: f64 = 3.5;
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            calibration_constant: Self::DEFAULT_CALIBRATION_CONSTANT,
            reference_width: Self::DEFAULT_REFERENCE_WIDTH,
        }
    }
}

/// Size floors for per-contour overlay markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Rotated boxes are drawn for contours whose bounding-rect area is
    /// at least this many square pixels.
    pub min_box_area: u64,
    /// Enclosing circles are drawn when the radius is at least this.
    pub min_circle_radius: f64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            min_box_area: 0,
            min_circle_radius: 0.0,
        }
    }
}

/// Optional stages of the single parameterized pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    /// Convert the selected object's pixel width into a distance.
    pub estimate_distance: bool,
    /// Compute overlay markers for every contour, not just the selected one.
    pub annotate_contours: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            estimate_distance: true,
            annotate_contours: false,
        }
    }
}

/// Configuration for one tick of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Noise filter for the raw frame.
    pub denoise: DenoiseFilter,
    /// Apply a 3×3 box blur to the HSV image before thresholding.
    pub hsv_smoothing: bool,
    /// Accepted color window.
    pub segmentation: SegmentationRange,
    /// Mask refinement parameters.
    pub morphology: MorphologyConfig,
    /// Which mask contours are extracted from.
    pub contour_source: ContourSource,
    /// Contour tracing strategy.
    pub contour_tracer: ContourTracerKind,
    /// Selection floor and approximation tolerance.
    pub selection: SelectionConfig,
    /// Distance model calibration.
    pub range: RangeConfig,
    /// Per-contour overlay floors.
    pub annotations: AnnotationConfig,
    /// Optional stages.
    pub stages: StageToggles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            denoise: DenoiseFilter::default(),
            hsv_smoothing: true,
            segmentation: SegmentationRange::default(),
            morphology: MorphologyConfig::default(),
            contour_source: ContourSource::default(),
            contour_tracer: ContourTracerKind::default(),
            selection: SelectionConfig::default(),
            range: RangeConfig::default(),
            annotations: AnnotationConfig::default(),
            stages: StageToggles::default(),
        }
    }
}
