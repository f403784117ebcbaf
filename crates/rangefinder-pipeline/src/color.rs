//! Frame decoding and RGB-to-HSV conversion.
//!
//! Frames arrive either as decoded [`RgbImage`]s from a live source or
//! as encoded bytes (PNG, JPEG, BMP, WebP) read from disk. Segmentation
//! works in 8-bit HSV with the common machine-vision layout: hue is
//! degrees halved (0–179), saturation and value span 0–255.

use image::{Rgb, RgbImage};

use crate::types::PipelineError;

/// Decode raw image bytes into an RGB frame.
///
/// Alpha, if present, is dropped.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Convert one RGB pixel to 8-bit HSV.
///
/// Hue is computed in degrees, halved, and rounded; a result of 180
/// wraps to 0. Grays (zero chroma) have hue and saturation 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = f32::from(max - min);

    let saturation = if max == 0 {
        0
    } else {
        (255.0 * chroma / f32::from(max)).round() as u8
    };

    let hue = if max == min {
        0
    } else {
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let degrees = if max == rgb[0] {
            60.0 * (g - b) / chroma
        } else if max == rgb[1] {
            60.0f32.mul_add((b - r) / chroma, 120.0)
        } else {
            60.0f32.mul_add((r - g) / chroma, 240.0)
        };
        let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
        let half = (degrees / 2.0).round() as u16;
        if half >= 180 { (half - 180) as u8 } else { half as u8 }
    };

    [hue, saturation, max]
}

/// Convert a whole frame to HSV.
///
/// The returned image reuses the three-channel layout: channel 0 is
/// hue, 1 saturation, 2 value.
#[must_use = "returns the HSV image"]
pub fn to_hsv(frame: &RgbImage) -> RgbImage {
    let mut hsv = frame.clone();
    for pixel in hsv.pixels_mut() {
        *pixel = Rgb(rgb_to_hsv(pixel.0));
    }
    hsv
}
