//! Smoothing filters for frames and masks.
//!
//! [`box_blur_rgb`] and [`median_rgb`] suppress sensor and compression
//! speckle on three-channel images before and after color conversion.
//! [`gaussian_blur_sized`] smooths a mask with an explicit kernel size
//! and sigma pair, which `imageproc::filter::gaussian_blur_f32` (sigma
//! only, square support) cannot express, so it builds the weights and
//! hands them to `imageproc::filter::separable_filter`.

use image::{GrayImage, Luma, RgbImage};
use imageproc::definitions::Image;

/// Apply a box (mean) filter to each channel of an RGB image.
///
/// `radius` is the half-width of the square window; `1` gives the 3×3
/// filter used throughout the pipeline. A radius of zero returns the
/// image unchanged.
///
/// `imageproc::filter::box_filter` only accepts `GrayImage`, so the
/// image is split into three single-channel images, filtered, and
/// reassembled.
#[must_use = "returns the blurred image"]
pub fn box_blur_rgb(image: &RgbImage, radius: u32) -> RgbImage {
    if radius == 0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();

    let channels: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 3] =
        std::array::from_fn(|c| imageproc::filter::box_filter(&channels[c], radius, radius));

    RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Apply a per-channel median filter with the given window radius.
#[must_use = "returns the filtered image"]
pub fn median_rgb(image: &RgbImage, radius: u32) -> RgbImage {
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}

/// Sigma derived from an odd kernel size when none is given.
///
/// Matches the usual convention `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
#[must_use]
pub fn sigma_for_kernel(size: u32) -> f64 {
    0.3f64.mul_add((f64::from(size) - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Normalized 1-D Gaussian weights for an odd kernel `size`.
///
/// Non-positive `sigma` is derived from `size` with
/// [`sigma_for_kernel`].
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn gaussian_kernel(size: u32, sigma: f64) -> Vec<f32> {
    let size = size.max(1);
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        sigma_for_kernel(size)
    };
    let center = f64::from(size - 1) / 2.0;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = f64::from(i) - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Zero-pad an odd kernel on both sides to `len` taps.
///
/// `imageproc::filter::separable_filter` wants both passes the same
/// length; the padding taps contribute nothing.
fn pad_kernel(kernel: Vec<f32>, len: usize) -> Vec<f32> {
    if kernel.len() >= len {
        return kernel;
    }
    let side = (len - kernel.len()) / 2;
    let mut padded = vec![0.0; side];
    padded.extend(kernel);
    padded.resize(len, 0.0);
    padded
}

/// Gaussian-blur a single-channel image with an explicit kernel size.
///
/// `size` is `(width, height)` and should already be odd (see
/// [`crate::morphology::coerce_kernel_extent`]). A `sigma.1` of zero or
/// less inherits `sigma.0`; if both are non-positive each axis derives
/// its sigma from its own kernel size. A 1×1 kernel returns the image
/// unchanged.
///
/// Filtering runs in `f32` through `imageproc::filter::separable_filter`
/// (edge pixels replicated past the border) and rounds back to `u8`.
#[must_use = "returns the blurred image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gaussian_blur_sized(image: &GrayImage, size: (u32, u32), sigma: (f32, f32)) -> GrayImage {
    let (kx, ky) = size;
    if kx <= 1 && ky <= 1 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    let sigma_x = f64::from(sigma.0);
    let sigma_y = if sigma.1 > 0.0 {
        f64::from(sigma.1)
    } else {
        sigma_x
    };
    let h_kernel = gaussian_kernel(kx, sigma_x);
    let v_kernel = gaussian_kernel(ky, sigma_y);
    let len = h_kernel.len().max(v_kernel.len());
    let h_kernel = pad_kernel(h_kernel, len);
    let v_kernel = pad_kernel(v_kernel, len);

    let src: Image<Luma<f32>> =
        Image::from_fn(w, h, |x, y| Luma([f32::from(image.get_pixel(x, y).0[0])]));
    let blurred = imageproc::filter::separable_filter(&src, &h_kernel, &v_kernel);
    GrayImage::from_fn(w, h, |x, y| {
        Luma([blurred.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 { Luma([0]) } else { Luma([255]) }
        })
    }

    #[test]
    fn kernel_weights_sum_to_one_and_are_symmetric() {
        let k = gaussian_kernel(7, 1.5);
        assert_eq!(k.len(), 7);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        for i in 0..3 {
            assert!((k[i] - k[6 - i]).abs() < 1e-7);
        }
        assert!(k[3] > k[2]);
    }

    #[test]
    fn derived_sigma_for_size_three() {
        // 0.3 * (1 * 0.5 - 1) + 0.8 = 0.65
        assert!((sigma_for_kernel(3) - 0.65).abs() < 1e-12);
    }

    #[test]
    fn short_kernel_is_centered_by_padding() {
        assert_eq!(pad_kernel(vec![1.0], 5), vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(pad_kernel(vec![0.25, 0.5, 0.25], 3), vec![0.25, 0.5, 0.25]);
    }

    #[test]
    fn unit_kernel_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur_sized(&img, (1, 1), (0.0, 0.0)), img);
    }

    #[test]
    fn sized_blur_smooths_sharp_edge() {
        let img = sharp_edge_image();
        let blurred = gaussian_blur_sized(&img, (5, 5), (2.0, 0.0));
        let left = blurred.get_pixel(4, 5).0[0];
        let right = blurred.get_pixel(5, 5).0[0];
        assert!(left > 0, "expected left of edge above 0, got {left}");
        assert!(right < 255, "expected right of edge below 255, got {right}");
    }

    #[test]
    fn horizontal_only_kernel_leaves_columns_alone() {
        // A horizontal edge is untouched by a 5x1 kernel.
        let img = GrayImage::from_fn(8, 8, |_x, y| if y < 4 { Luma([0]) } else { Luma([255]) });
        let blurred = gaussian_blur_sized(&img, (5, 1), (1.0, 1.0));
        assert_eq!(blurred, img);
    }

    #[test]
    fn uniform_image_unchanged_by_sized_blur() {
        let img = GrayImage::from_pixel(9, 9, Luma([200]));
        let blurred = gaussian_blur_sized(&img, (7, 3), (0.0, 0.0));
        assert_eq!(blurred, img);
    }

    #[test]
    fn box_blur_zero_radius_is_identity() {
        let img = RgbImage::from_fn(4, 4, |x, y| image::Rgb([x as u8, y as u8, 9]));
        assert_eq!(box_blur_rgb(&img, 0), img);
    }

    #[test]
    fn box_blur_preserves_uniform_color() {
        let img = RgbImage::from_pixel(6, 6, image::Rgb([10, 150, 240]));
        let blurred = box_blur_rgb(&img, 1);
        assert!(blurred.pixels().all(|p| p.0 == [10, 150, 240]));
    }

    #[test]
    fn median_removes_isolated_speckle() {
        let mut img = RgbImage::from_pixel(7, 7, image::Rgb([20, 20, 20]));
        img.put_pixel(3, 3, image::Rgb([255, 255, 255]));
        let filtered = median_rgb(&img, 1);
        assert_eq!(filtered.get_pixel(3, 3).0, [20, 20, 20]);
    }
}
