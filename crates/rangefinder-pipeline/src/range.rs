//! Pinhole distance estimation.
//!
//! An object of known physical width `W` that spans `w` pixels lies at
//! distance `F × W / w`, where `F` is the focal-length equivalent in
//! pixels. `F` is measured once with [`calibrate`] from a shot of the
//! reference object at a known distance.

use crate::classify::ShapeClass;
use crate::config::RangeConfig;
use crate::geometry::BoundingGeometry;
use crate::types::PipelineError;

/// The apparent width used for ranging a shape of class `shape`.
///
/// Rectangles use the axis-aligned box's horizontal extent; circles use
/// the enclosing circle's diameter. Undefined shapes have no width.
#[must_use]
pub fn measurement_width(shape: ShapeClass, geometry: &BoundingGeometry) -> Option<f64> {
    match shape {
        ShapeClass::Rectangle => Some(f64::from(geometry.bounding_rect.width)),
        ShapeClass::Circle => Some(2.0 * geometry.enclosing_circle.radius),
        ShapeClass::Undefined => None,
    }
}

/// Distance to an object spanning `pixel_width` pixels.
///
/// Returns `None` when the width is zero, negative, or not finite, or
/// when the result itself would not be finite and positive.
#[must_use]
pub fn estimate_distance(pixel_width: f64, config: &RangeConfig) -> Option<f64> {
    if !(pixel_width.is_finite() && pixel_width > 0.0) {
        return None;
    }
    let distance = config.calibration_constant * config.reference_width / pixel_width;
    (distance.is_finite() && distance > 0.0).then_some(distance)
}

/// Derive the focal-length equivalent from a calibration shot.
///
/// `pixel_width` is the reference object's apparent width when placed
/// `known_distance` away; `reference_width` is its physical width.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidCalibration`] if any input is not
/// finite and positive.
pub fn calibrate(
    pixel_width: f64,
    known_distance: f64,
    reference_width: f64,
) -> Result<f64, PipelineError> {
    for (name, value) in [
        ("pixel width", pixel_width),
        ("known distance", known_distance),
        ("reference width", reference_width),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(PipelineError::InvalidCalibration(format!(
                "{name} must be finite and positive, got {value}"
            )));
        }
    }
    Ok(pixel_width * known_distance / reference_width)
}
