//! Color segmentation: raw frame to binary mask.
//!
//! 1. Denoise the raw frame (3×3 median or box, or nothing).
//! 2. Convert to 8-bit HSV.
//! 3. Optionally box-smooth the HSV image.
//! 4. Keep pixels whose H, S, and V all fall inside the configured
//!    inclusive intervals.

use image::{GrayImage, Luma, RgbImage};

use crate::config::{DenoiseFilter, PipelineConfig, SegmentationRange};

/// Window radius of the 3×3 denoise and smoothing filters.
const FILTER_RADIUS: u32 = 1;

/// Output of [`preprocess`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// The HSV image that was thresholded (after optional smoothing).
    pub hsv: RgbImage,
    /// Binary mask: 255 where the pixel is inside the range, else 0.
    pub mask: GrayImage,
}

/// Apply the configured denoise filter to a raw frame.
#[must_use = "returns the filtered frame"]
pub fn denoise(frame: &RgbImage, filter: DenoiseFilter) -> RgbImage {
    match filter {
        DenoiseFilter::Median => crate::blur::median_rgb(frame, FILTER_RADIUS),
        DenoiseFilter::Box => crate::blur::box_blur_rgb(frame, FILTER_RADIUS),
        DenoiseFilter::Disabled => frame.clone(),
    }
}

/// Threshold an HSV image against `range`.
///
/// The range is clamped first, so hue bounds above 179 behave as 179.
/// Output pixels are exactly 0 or 255.
#[must_use = "returns the binary mask"]
pub fn threshold(hsv: &RgbImage, range: &SegmentationRange) -> GrayImage {
    let range = range.clamped();
    let (w, h) = hsv.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        if range.contains(hsv.get_pixel(x, y).0) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Run the full preprocessing chain for one frame.
#[must_use]
pub fn preprocess(frame: &RgbImage, config: &PipelineConfig) -> Preprocessed {
    let denoised = denoise(frame, config.denoise);
    let hsv = crate::color::to_hsv(&denoised);
    let hsv = if config.hsv_smoothing {
        crate::blur::box_blur_rgb(&hsv, FILTER_RADIUS)
    } else {
        hsv
    };
    let mask = threshold(&hsv, &config.segmentation);
    Preprocessed { hsv, mask }
}

/// Count foreground (non-zero) pixels in a mask.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}
