//! Per-tick diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning. [`process_frame_with_diagnostics`] runs one tick and
//! collects a [`FrameDiagnostics`] alongside the [`FrameOutput`].
//!
//! Timestamps come from a caller-supplied [`Clock`] so this crate stays
//! free of platform timing APIs.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ShapeClass;
use crate::config::{ContourSource, DenoiseFilter, PipelineConfig};
use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{Contour, FrameOutput, RgbImage};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
///
/// Native callers wrap `std::time::Instant`; tests can supply a fake.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Stage 1: denoise, HSV conversion, thresholding.
    pub preprocess: StageDiagnostics,
    /// Stage 2: Gaussian smoothing and morphology.
    pub refine: StageDiagnostics,
    /// Stage 3: contour extraction.
    pub contours: StageDiagnostics,
    /// Stage 4: selection and classification.
    pub select: StageDiagnostics,
    /// Stage 5: geometry, distance, and annotations.
    pub measure: StageDiagnostics,
    /// Total wall-clock duration of the tick (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the tick's outcome.
    pub summary: FrameSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Segmentation metrics.
    Preprocess {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
        /// Denoise filter applied to the raw frame.
        denoise: DenoiseFilter,
        /// Whether the HSV image was box-smoothed.
        hsv_smoothing: bool,
        /// Pixels inside the color range.
        foreground_pixels: u64,
        /// Total pixel count, for foreground density.
        total_pixels: u64,
    },
    /// Refinement metrics, with the coerced kernel and element sizes.
    Refine {
        /// Coerced Gaussian kernel width.
        kernel_x: u32,
        /// Coerced Gaussian kernel height.
        kernel_y: u32,
        /// Coerced structuring element width.
        element_width: u32,
        /// Coerced structuring element height.
        element_height: u32,
        /// Opening/closing iterations.
        passes: u32,
        /// Foreground pixels before refinement.
        foreground_before: u64,
        /// Foreground pixels after refinement.
        foreground_after: u64,
    },
    /// Contour extraction metrics.
    ContourExtraction {
        /// Which mask was traced.
        source: ContourSource,
        /// Number of contours found.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Minimum points in any single contour.
        min_contour_points: usize,
        /// Maximum points in any single contour.
        max_contour_points: usize,
        /// Mean points per contour.
        mean_contour_points: f64,
    },
    /// Selection and classification metrics.
    Selection {
        /// Area floor in effect.
        min_area: f64,
        /// Index of the selected contour.
        selected_index: Option<usize>,
        /// Area of the selected contour.
        area: Option<f64>,
        /// Approximation vertex count.
        vertex_count: Option<usize>,
        /// Assigned shape class.
        shape: Option<ShapeClass>,
    },
    /// Geometry and range metrics.
    Measurement {
        /// Whether distance estimation was switched on.
        estimate_distance: bool,
        /// Apparent width used for ranging.
        pixel_width: Option<f64>,
        /// Estimated distance.
        distance: Option<f64>,
        /// Number of per-contour annotations computed.
        annotation_count: usize,
    },
}

/// High-level summary of one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Frame width in pixels.
    pub image_width: u32,
    /// Frame height in pixels.
    pub image_height: u32,
    /// Number of contours found.
    pub contour_count: usize,
    /// Shape of the selected object, if any.
    pub shape: Option<ShapeClass>,
    /// Estimated distance, if any.
    pub distance: Option<f64>,
}

impl FrameDiagnostics {
    /// Stages in execution order with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Preprocess", &self.preprocess),
            ("Refine", &self.refine),
            ("Contours", &self.contours),
            ("Select", &self.select),
            ("Measure", &self.measure),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Frame Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        let shape = self
            .summary
            .shape
            .map_or_else(|| "none".to_string(), |s| s.to_string());
        let distance = self
            .summary
            .distance
            .map_or_else(|| "none".to_string(), |d| format!("{d:.2}"));
        lines.push(format!(
            "Contours: {}  |  Shape: {shape}  |  Distance: {distance}",
            self.summary.contour_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Preprocess {
            width,
            height,
            denoise,
            hsv_smoothing,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "{width}x{height} denoise={denoise:?} smooth={hsv_smoothing} fg={foreground_pixels} ({density:.1}%)",
            )
        }
        StageMetrics::Refine {
            kernel_x,
            kernel_y,
            element_width,
            element_height,
            passes,
            foreground_before,
            foreground_after,
        } => format!(
            "kernel={kernel_x}x{kernel_y} element={element_width}x{element_height} passes={passes} fg={foreground_before}->{foreground_after}",
        ),
        StageMetrics::ContourExtraction {
            source,
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => format!(
            "{source:?}: {contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
        ),
        StageMetrics::Selection {
            min_area,
            selected_index,
            area,
            vertex_count,
            shape,
        } => match selected_index {
            Some(index) => format!(
                "#{index} area={} vertices={} shape={}",
                format_optional(area.map(|a| format!("{a:.1}"))),
                format_optional(*vertex_count),
                format_optional(*shape),
            ),
            None => format!("nothing above min_area={min_area}"),
        },
        StageMetrics::Measurement {
            estimate_distance,
            pixel_width,
            distance,
            annotation_count,
        } => format!(
            "width={} distance={} ranging={estimate_distance} annotations={annotation_count}",
            format_optional(pixel_width.map(|w| format!("{w:.1}px"))),
            format_optional(distance.map(|d| format!("{d:.2}"))),
        ),
    }
}

/// Statistics for a set of contours.
pub(crate) struct ContourStats {
    /// Total number of points across all contours.
    pub total: usize,
    /// Minimum number of points in any single contour.
    pub min: usize,
    /// Maximum number of points in any single contour.
    pub max: usize,
    /// Mean number of points per contour.
    pub mean: f64,
}

/// Compute point-count statistics for a set of contours.
pub(crate) fn contour_stats(contours: &[Contour]) -> ContourStats {
    let total: usize = contours.iter().map(Contour::len).sum();
    let min = contours.iter().map(Contour::len).min().unwrap_or(0);
    let max = contours.iter().map(Contour::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}

/// Time one stage transition and capture the new stage's metrics.
fn timed<C, S, N>(clock: &C, current: S, advance: impl FnOnce(S) -> N) -> (N, StageDiagnostics)
where
    C: Clock,
    N: PipelineStage,
{
    let start = clock.now();
    let next = advance(current);
    let duration = clock.elapsed(&start);
    tracing::debug!(stage = N::NAME, ?duration, "stage complete");
    let metrics = next.metrics();
    (next, StageDiagnostics { duration, metrics })
}

/// Run one tick and collect per-stage diagnostics.
pub fn process_frame_with_diagnostics<C: Clock>(
    frame: RgbImage,
    config: &PipelineConfig,
    clock: &C,
) -> (FrameOutput, FrameDiagnostics) {
    let start = clock.now();
    let pending = Pipeline::new(frame, config);
    let (preprocessed, preprocess) = timed(clock, pending, |s| s.preprocess());
    let (refined, refine) = timed(clock, preprocessed, |s| s.refine());
    let (extracted, contours) = timed(clock, refined, |s| s.extract_contours());
    let (selected, select) = timed(clock, extracted, |s| s.select());
    let (measured, measure) = timed(clock, selected, |s| s.measure());
    let output = measured.into_result();
    let total_duration = clock.elapsed(&start);

    let summary = FrameSummary {
        image_width: output.dimensions.width,
        image_height: output.dimensions.height,
        contour_count: output.contours.len(),
        shape: output.detection.as_ref().map(|d| d.shape),
        distance: output.detection.as_ref().and_then(|d| d.distance),
    };

    let diagnostics = FrameDiagnostics {
        preprocess,
        refine,
        contours,
        select,
        measure,
        total_duration,
        summary,
    };
    (output, diagnostics)
}
