//! rangefinder-pipeline: Pure per-frame vision pipeline (sans-IO).
//!
//! Finds the largest object of a chosen color in a frame, classifies it
//! as a rectangle or circle, and estimates its distance from its
//! apparent width:
//! denoise -> HSV threshold -> morphological refinement ->
//! contour extraction -> largest-contour selection ->
//! polygon approximation and classification -> bounding geometry ->
//! distance estimate.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! frames and returns structured data. Capture, live controls, and
//! display plug in through the traits in [`tick`].

pub mod approx;
pub mod blur;
pub mod classify;
pub mod color;
pub mod config;
pub mod contour;
pub mod diagnostics;
pub mod geometry;
pub mod morphology;
pub mod pipeline;
pub mod preprocess;
pub mod range;
pub mod tick;
pub mod types;

pub use classify::ShapeClass;
pub use config::{
    AnnotationConfig, ChannelBounds, ContourSource, DenoiseFilter, ElementShape, MorphologyConfig,
    PipelineConfig, RangeConfig, SegmentationRange, SelectionConfig, StageToggles,
};
pub use contour::{ContourTracer, ContourTracerKind};
pub use diagnostics::{Clock, FrameDiagnostics, process_frame_with_diagnostics};
pub use geometry::{BoundingGeometry, BoundingRect, EnclosingCircle, RotatedRect};
pub use pipeline::{Pipeline, PipelineStage};
pub use tick::{
    ControlSurface, FrameSource, Renderer, RunSummary, SourceError, StopReason, StopSignal, Tick,
};
pub use types::{
    Contour, ContourAnnotation, Detection, Dimensions, FrameOutput, GrayImage, GridPoint,
    PipelineError, Point, PolygonApproximation, RgbImage,
};

/// Run one tick of the pipeline on a decoded frame.
///
/// Equivalent to driving [`Pipeline`] through every stage. Never fails:
/// a frame with no qualifying contour yields `detection: None`, and a
/// degenerate width yields `distance: None`.
///
/// # Pipeline steps
///
/// 1. Denoise, convert to HSV, optionally smooth, threshold
/// 2. Blur, open, close, and re-binarize the mask
/// 3. Trace outer contours of the raw or refined mask
/// 4. Select the largest contour and classify it by vertex count
/// 5. Measure bounding geometry, estimate distance, annotate contours
#[must_use]
pub fn process_frame(frame: RgbImage, config: &PipelineConfig) -> FrameOutput {
    Pipeline::new(frame, config)
        .preprocess()
        .refine()
        .extract_contours()
        .select()
        .measure()
        .into_result()
}

/// Decode image bytes (PNG, JPEG, BMP, WebP) and run one tick.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process_bytes(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<FrameOutput, PipelineError> {
    let frame = color::decode_frame(image_bytes)?;
    Ok(process_frame(frame, config))
}
