//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process_frame`] which runs a whole tick in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use rangefinder_pipeline::{Pipeline, PipelineConfig, RgbImage};
//! let config = PipelineConfig::default();
//! let frame = RgbImage::new(64, 48);
//! let output = Pipeline::new(frame, &config)
//!     .preprocess()
//!     .refine()
//!     .extract_contours()
//!     .select()
//!     .measure()
//!     .into_result();
//! assert!(output.detection.is_none() || !output.contours.is_empty());
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state, carrying all previously computed intermediates. None of the
//! stages can fail: out-of-range configuration is coerced where it is
//! read, and degenerate measurements come out as `None`.
//!
//! The configuration is borrowed for the whole tick. The pipeline
//! never writes to it.

use crate::classify::{Classification, ShapeClass};
use crate::config::{ContourSource, PipelineConfig};
use crate::contour::ContourTracer;
use crate::diagnostics::StageMetrics;
use crate::types::{
    Contour, ContourAnnotation, Detection, Dimensions, FrameOutput, GrayImage, RgbImage,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`preprocess`](Self::preprocess) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .preprocess() to continue"]
pub struct Pending<'a> {
    config: &'a PipelineConfig,
    frame: RgbImage,
}

impl<'a> Pending<'a> {
    /// The raw frame.
    #[must_use]
    pub const fn frame(&self) -> &RgbImage {
        &self.frame
    }

    /// Denoise, convert to HSV, and threshold.
    pub fn preprocess(self) -> Preprocessed<'a> {
        let dimensions = Dimensions {
            width: self.frame.width(),
            height: self.frame.height(),
        };
        let crate::preprocess::Preprocessed { hsv, mask } =
            crate::preprocess::preprocess(&self.frame, self.config);
        tracing::trace!(
            foreground = crate::preprocess::count_foreground(&mask),
            "segmented frame"
        );
        Preprocessed {
            config: self.config,
            frame: self.frame,
            hsv,
            mask,
            dimensions,
        }
    }
}

// ───────────────────────── Stage 1: Preprocessed ─────────────────────

/// Pipeline state after color segmentation.
///
/// Call [`refine`](Self::refine) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .refine() to continue"]
pub struct Preprocessed<'a> {
    config: &'a PipelineConfig,
    frame: RgbImage,
    hsv: RgbImage,
    mask: GrayImage,
    dimensions: Dimensions,
}

impl<'a> Preprocessed<'a> {
    /// The (possibly smoothed) HSV image.
    #[must_use]
    pub const fn hsv(&self) -> &RgbImage {
        &self.hsv
    }

    /// The thresholded mask, before refinement.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Smooth and morphologically clean the mask.
    ///
    /// The thresholded mask is kept alongside the refined one; which of
    /// the two feeds contour extraction is decided by
    /// [`ContourSource`].
    pub fn refine(self) -> Refined<'a> {
        let refined = crate::morphology::refine(&self.mask, &self.config.morphology);
        Refined {
            config: self.config,
            frame: self.frame,
            hsv: self.hsv,
            thresholded: self.mask,
            refined,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 2: Refined ──────────────────────────

/// Pipeline state after morphological refinement.
///
/// Call [`extract_contours`](Self::extract_contours) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .extract_contours() to continue"]
pub struct Refined<'a> {
    config: &'a PipelineConfig,
    frame: RgbImage,
    hsv: RgbImage,
    thresholded: GrayImage,
    refined: GrayImage,
    dimensions: Dimensions,
}

impl<'a> Refined<'a> {
    /// The refined mask (what the renderer displays).
    #[must_use]
    pub const fn refined(&self) -> &GrayImage {
        &self.refined
    }

    /// The mask contours will be extracted from.
    #[must_use]
    pub const fn contour_input(&self) -> &GrayImage {
        match self.config.contour_source {
            ContourSource::Unrefined => &self.thresholded,
            ContourSource::Refined => &self.refined,
        }
    }

    /// Trace outer boundaries of the selected mask.
    pub fn extract_contours(self) -> ContoursExtracted<'a> {
        let contours = self.config.contour_tracer.trace(self.contour_input());
        tracing::trace!(count = contours.len(), "extracted contours");
        ContoursExtracted {
            config: self.config,
            frame: self.frame,
            hsv: self.hsv,
            refined: self.refined,
            contours,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 3: ContoursExtracted ────────────────

/// Pipeline state after contour extraction.
///
/// Call [`select`](Self::select) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .select() to continue"]
pub struct ContoursExtracted<'a> {
    config: &'a PipelineConfig,
    frame: RgbImage,
    hsv: RgbImage,
    refined: GrayImage,
    contours: Vec<Contour>,
    dimensions: Dimensions,
}

impl<'a> ContoursExtracted<'a> {
    /// All extracted contours.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Pick the object of interest and classify it.
    pub fn select(self) -> Selected<'a> {
        let selection =
            crate::classify::select_largest(&self.contours, self.config.selection.min_area).map(
                |(index, area)| {
                    let classification = crate::classify::classify(
                        &self.contours[index],
                        self.config.selection.approximation_fraction,
                    );
                    Selection {
                        index,
                        area,
                        classification,
                    }
                },
            );
        Selected {
            config: self.config,
            frame: self.frame,
            hsv: self.hsv,
            refined: self.refined,
            contours: self.contours,
            selection,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 4: Selected ─────────────────────────

/// The contour chosen as the object of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Index into the extracted contours.
    pub index: usize,
    /// Enclosed area in square pixels.
    pub area: f64,
    /// Approximation and shape class.
    pub classification: Classification,
}

/// Pipeline state after selection and classification.
///
/// Call [`measure`](Self::measure) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .measure() to continue"]
pub struct Selected<'a> {
    config: &'a PipelineConfig,
    frame: RgbImage,
    hsv: RgbImage,
    refined: GrayImage,
    contours: Vec<Contour>,
    selection: Option<Selection>,
    dimensions: Dimensions,
}

impl<'a> Selected<'a> {
    /// The selected contour, if any cleared the area floor.
    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Compute bounding geometry and distance for the selection, and
    /// per-contour annotations when enabled.
    pub fn measure(self) -> Measured {
        let detection = self.selection.map(|selection| {
            let contour = self.contours[selection.index].clone();
            let geometry = crate::geometry::measure(&contour);
            let shape = selection.classification.shape;
            let pixel_width = crate::range::measurement_width(shape, &geometry);
            let distance = if self.config.stages.estimate_distance {
                let distance = pixel_width
                    .and_then(|w| crate::range::estimate_distance(w, &self.config.range));
                if distance.is_none() && shape != ShapeClass::Undefined {
                    tracing::debug!(?pixel_width, %shape, "degenerate width, no distance estimate");
                }
                distance
            } else {
                None
            };
            Detection {
                contour_index: selection.index,
                contour,
                area: selection.area,
                approximation: selection.classification.approximation,
                shape,
                geometry,
                pixel_width,
                distance,
            }
        });

        let annotations = if self.config.stages.annotate_contours {
            annotate(&self.contours, self.config)
        } else {
            Vec::new()
        };

        Measured {
            frame: self.frame,
            hsv: self.hsv,
            refined: self.refined,
            contours: self.contours,
            detection,
            annotations,
            dimensions: self.dimensions,
            estimate_distance: self.config.stages.estimate_distance,
        }
    }
}

/// Rotated box and enclosing circle for every contour, each flagged
/// against its size floor.
fn annotate(contours: &[Contour], config: &PipelineConfig) -> Vec<ContourAnnotation> {
    contours
        .iter()
        .enumerate()
        .map(|(contour_index, contour)| {
            let geometry = crate::geometry::measure(contour);
            ContourAnnotation {
                contour_index,
                rotated_rect: geometry.rotated_rect,
                enclosing_circle: geometry.enclosing_circle,
                draw_box: geometry.bounding_rect.area() >= config.annotations.min_box_area,
                draw_circle: geometry.enclosing_circle.radius
                    >= config.annotations.min_circle_radius,
            }
        })
        .collect()
}

// ───────────────────────── Stage 5: Measured ─────────────────────────

/// Pipeline state after geometry and range estimation; the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`FrameOutput`].
#[must_use = "call .into_result() to extract the FrameOutput"]
pub struct Measured {
    frame: RgbImage,
    hsv: RgbImage,
    refined: GrayImage,
    contours: Vec<Contour>,
    detection: Option<Detection>,
    annotations: Vec<ContourAnnotation>,
    dimensions: Dimensions,
    estimate_distance: bool,
}

impl Measured {
    /// The detection, if an object was selected.
    #[must_use]
    pub const fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    /// Per-contour annotations (empty unless enabled).
    #[must_use]
    pub fn annotations(&self) -> &[ContourAnnotation] {
        &self.annotations
    }

    /// Frame dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return everything the tick produced.
    #[must_use]
    pub fn into_result(self) -> FrameOutput {
        FrameOutput {
            frame: self.frame,
            hsv: self.hsv,
            mask: self.refined,
            contours: self.contours,
            detection: self.detection,
            annotations: self.annotations,
            dimensions: self.dimensions,
        }
    }
}

// ──────────────────── PipelineStage trait ─────────────────────────────

/// Number of processing stages after [`Pending`].
pub const STAGE_COUNT: usize = 5;

/// Trait implemented by every processing stage, so diagnostics can
/// name and measure stages uniformly.
pub trait PipelineStage {
    /// Human-readable name of this stage (e.g. `"preprocess"`).
    const NAME: &'static str;

    /// Zero-based index of this stage (`0` for Preprocessed through `4`
    /// for Measured).
    const INDEX: usize;

    /// Stage-specific metrics describing the work done to reach this
    /// state.
    fn metrics(&self) -> StageMetrics;
}

impl PipelineStage for Preprocessed<'_> {
    const NAME: &'static str = "preprocess";
    const INDEX: usize = 0;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Preprocess {
            width: self.dimensions.width,
            height: self.dimensions.height,
            denoise: self.config.denoise,
            hsv_smoothing: self.config.hsv_smoothing,
            foreground_pixels: crate::preprocess::count_foreground(&self.mask),
            total_pixels: u64::from(self.dimensions.width) * u64::from(self.dimensions.height),
        }
    }
}

impl PipelineStage for Refined<'_> {
    const NAME: &'static str = "refine";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        let m = &self.config.morphology;
        StageMetrics::Refine {
            kernel_x: crate::morphology::coerce_kernel_extent(m.kernel_x, m.kernel_max),
            kernel_y: crate::morphology::coerce_kernel_extent(m.kernel_y, m.kernel_max),
            element_width: crate::morphology::coerce_element_size(m.element_width),
            element_height: crate::morphology::coerce_element_size(m.element_height),
            passes: m.passes,
            foreground_before: crate::preprocess::count_foreground(&self.thresholded),
            foreground_after: crate::preprocess::count_foreground(&self.refined),
        }
    }
}

impl PipelineStage for ContoursExtracted<'_> {
    const NAME: &'static str = "contours";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        let stats = crate::diagnostics::contour_stats(&self.contours);
        StageMetrics::ContourExtraction {
            source: self.config.contour_source,
            contour_count: self.contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        }
    }
}

impl PipelineStage for Selected<'_> {
    const NAME: &'static str = "select";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Selection {
            min_area: self.config.selection.min_area,
            selected_index: self.selection.as_ref().map(|s| s.index),
            area: self.selection.as_ref().map(|s| s.area),
            vertex_count: self
                .selection
                .as_ref()
                .map(|s| s.classification.approximation.vertex_count()),
            shape: self.selection.as_ref().map(|s| s.classification.shape),
        }
    }
}

impl PipelineStage for Measured {
    const NAME: &'static str = "measure";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Measurement {
            estimate_distance: self.estimate_distance,
            pixel_width: self.detection.as_ref().and_then(|d| d.pixel_width),
            distance: self.detection.as_ref().and_then(|d| d.distance),
            annotation_count: self.annotations.len(),
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental per-frame pipeline.
///
/// Created via [`Pipeline::new`], which stores the frame and a borrow of
/// the config without doing any processing. Each stage method consumes
/// the current state and returns the next, making it a compile-time
/// error to skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline for one frame.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(frame: RgbImage, config: &PipelineConfig) -> Pending<'_> {
        Pending { config, frame }
    }
}
