//! Offline calibration of the focal-length-equivalent constant.

use std::path::Path;

use rangefinder_pipeline::{PipelineConfig, ShapeClass};
use serde::Serialize;

use crate::error::CliError;

/// Result of a calibration shot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    /// Shape the pipeline detected, when the width was measured.
    pub shape: Option<ShapeClass>,
    /// Apparent width of the reference object in pixels.
    pub pixel_width: f64,
    /// Distance the shot was taken at.
    pub known_distance: f64,
    /// Physical width of the reference object.
    pub reference_width: f64,
    /// Derived constant for [`rangefinder_pipeline::RangeConfig::calibration_constant`].
    pub calibration_constant: f64,
}

/// Run the pipeline on `image` and return the selected object's ranging width.
///
/// # Errors
///
/// Fails if the image cannot be read or decoded, if no object is
/// selected, or if the selected object is [`ShapeClass::Undefined`].
pub fn measure_pixel_width(
    image: &Path,
    config: &PipelineConfig,
) -> Result<(ShapeClass, f64), CliError> {
    let bytes = std::fs::read(image).map_err(|source| CliError::Read {
        path: image.to_path_buf(),
        source,
    })?;
    let output = rangefinder_pipeline::process_bytes(&bytes, config)?;
    let detection = output
        .detection
        .ok_or_else(|| CliError::NoDetection(image.to_path_buf()))?;
    let width = detection
        .pixel_width
        .ok_or(CliError::Unmeasurable(detection.shape))?;
    tracing::info!(
        image = %image.display(),
        shape = %detection.shape,
        pixel_width = width,
        "measured reference object"
    );
    Ok((detection.shape, width))
}

/// Derive the calibration constant for a shot taken `known_distance` away.
///
/// When `pixel_width` is given the image is not read. `reference_width`
/// defaults to the configured one.
///
/// # Errors
///
/// Fails if the width cannot be measured or any input is not finite and
/// positive.
pub fn calibrate(
    image: &Path,
    config: &PipelineConfig,
    known_distance: f64,
    reference_width: Option<f64>,
    pixel_width: Option<f64>,
) -> Result<Calibration, CliError> {
    let (shape, pixel_width) = match pixel_width {
        Some(width) => (None, width),
        None => {
            let (shape, width) = measure_pixel_width(image, config)?;
            (Some(shape), width)
        }
    };
    let reference_width = reference_width.unwrap_or(config.range.reference_width);
    let calibration_constant =
        rangefinder_pipeline::range::calibrate(pixel_width, known_distance, reference_width)?;
    Ok(Calibration {
        shape,
        pixel_width,
        known_distance,
        reference_width,
        calibration_constant,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;
    use rangefinder_pipeline::{ChannelBounds, DenoiseFilter, PipelineError, RgbImage};

    use super::*;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig {
            denoise: DenoiseFilter::Disabled,
            hsv_smoothing: false,
            ..PipelineConfig::default()
        };
        config.segmentation.value = ChannelBounds::new(128, 255);
        config
    }

    fn square_png(dir: &Path, side: u32) -> std::path::PathBuf {
        let path = dir.join("reference.png");
        RgbImage::from_fn(200, 200, |x, y| {
            if (50..50 + side).contains(&x) && (50..50 + side).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
        .save(&path)
        .unwrap();
        path
    }

    #[test]
    fn measured_square_reproduces_reference_constant() {
        let dir = tempfile::tempdir().unwrap();
        let image = square_png(dir.path(), 100);
        let calibration = calibrate(&image, &config(), 19.95, None, None).unwrap();
        assert_eq!(calibration.shape, Some(ShapeClass::Rectangle));
        assert!((calibration.pixel_width - 100.0).abs() < f64::EPSILON);
        assert!((calibration.reference_width - 3.5).abs() < f64::EPSILON);
        assert!((calibration.calibration_constant - 570.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_width_skips_the_image() {
        let calibration = calibrate(
            Path::new("does-not-exist.png"),
            &config(),
            40.0,
            Some(7.0),
            Some(50.0),
        )
        .unwrap();
        assert_eq!(calibration.shape, None);
        assert!((calibration.calibration_constant - 50.0 * 40.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn empty_image_has_no_detection() {
        let dir = tempfile::tempdir().unwrap();
        let image = square_png(dir.path(), 0);
        assert!(matches!(
            calibrate(&image, &config(), 10.0, None, None),
            Err(CliError::NoDetection(_))
        ));
    }

    #[test]
    fn non_positive_distance_is_rejected() {
        assert!(matches!(
            calibrate(Path::new("unused.png"), &config(), 0.0, None, Some(80.0)),
            Err(CliError::Pipeline(PipelineError::InvalidCalibration(_)))
        ));
    }
}
