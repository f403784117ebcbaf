//! Morphological mask refinement.
//!
//! Smooths the thresholded mask, then runs an opening (erode, dilate)
//! to drop foreground speckle and a closing (dilate, erode) to fill
//! small holes. Each operation repeats `passes` times with the same
//! structuring element.
//!
//! Erosion and dilation are `imageproc::morphology::grayscale_erode` and
//! `grayscale_dilate` over a [`Mask`] built from the element footprint.
//! Footprint cells that fall outside the image are ignored, so borders
//! neither erode nor grow the foreground.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use crate::config::{ElementShape, MorphologyConfig};

/// Pixels at or above this value survive re-binarization.
pub const BINARY_THRESHOLD: u8 = 128;

/// Coerce a Gaussian kernel extent to an odd value in `1..=max`.
///
/// Even values are bumped to the next odd value; values above `max`
/// are clamped first (an even `max` is itself bumped). Odd values in
/// range pass through unchanged, so the coercion is idempotent.
#[must_use]
pub const fn coerce_kernel_extent(value: u32, max: u32) -> u32 {
    let max = if max == 0 {
        1
    } else if max % 2 == 0 {
        max + 1
    } else {
        max
    };
    let value = if value > max { max } else { value };
    if value % 2 == 0 { value + 1 } else { value }
}

/// Largest structuring element extent `imageproc::morphology::Mask` accepts.
pub const MAX_ELEMENT_SIZE: u32 = 511;

/// Coerce a structuring element dimension to `1..=MAX_ELEMENT_SIZE`.
#[must_use]
pub const fn coerce_element_size(value: u32) -> u32 {
    if value == 0 {
        1
    } else if value > MAX_ELEMENT_SIZE {
        MAX_ELEMENT_SIZE
    } else {
        value
    }
}

/// A structuring element: its footprint and the `imageproc` mask built
/// from it.
///
/// The anchor is the element's center cell (`width / 2`, `height / 2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    footprint: GrayImage,
    mask: Mask,
}

impl StructuringElement {
    /// Build an element of the given shape and size.
    ///
    /// Sizes are coerced with [`coerce_element_size`]. A 1×1 element is
    /// a single cell regardless of shape.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(shape: ElementShape, width: u32, height: u32) -> Self {
        let width = coerce_element_size(width);
        let height = coerce_element_size(height);
        let (ax, ay) = (width / 2, height / 2);

        let footprint = match shape {
            ElementShape::Rectangle => GrayImage::from_pixel(width, height, Luma([255])),
            ElementShape::Cross => GrayImage::from_fn(width, height, |x, y| {
                Luma([if x == ax || y == ay { 255 } else { 0 }])
            }),
            ElementShape::Ellipse => {
                // Each row keeps the columns inside the ellipse at that height.
                let r = f64::from(ay);
                let c = f64::from(ax);
                let inv_r2 = if ay > 0 { 1.0 / (r * r) } else { 0.0 };
                GrayImage::from_fn(width, height, |x, y| {
                    let dy = f64::from(y) - r;
                    if dy.abs() > r {
                        return Luma([0]);
                    }
                    let dx = (c * (r.mul_add(r, -(dy * dy)) * inv_r2).sqrt()).round() as u32;
                    let inside = x + dx >= ax && x <= ax + dx;
                    Luma([if inside { 255 } else { 0 }])
                })
            }
        };
        // Sizes are at most 511, so the anchor fits in a byte.
        let mask = Mask::from_image(&footprint, ax as u8, ay as u8);

        Self { footprint, mask }
    }

    /// Element width in cells.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.footprint.width()
    }

    /// Element height in cells.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.footprint.height()
    }

    /// Whether the cell at column `x`, row `y` belongs to the element.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.footprint.get_pixel_checked(x, y).is_some_and(|p| p.0[0] != 0)
    }

    /// Number of cells in the element.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.footprint.pixels().filter(|p| p.0[0] != 0).count()
    }

    /// Whether the element is the single anchor cell (a no-op for
    /// erosion and dilation).
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.footprint.dimensions() == (1, 1)
    }
}

/// Erode `image` once: each pixel becomes the minimum over the element.
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_erode(image, &element.mask)
}

/// Dilate `image` once: each pixel becomes the maximum over the element.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_dilate(image, &element.mask)
}

/// Apply `op` to `image` `passes` times.
fn repeat(
    image: GrayImage,
    element: &StructuringElement,
    passes: u32,
    op: fn(&GrayImage, &StructuringElement) -> GrayImage,
) -> GrayImage {
    (0..passes).fold(image, |acc, _| op(&acc, element))
}

/// Morphological opening: `passes` erosions, then `passes` dilations.
#[must_use = "returns the opened image"]
pub fn open(image: &GrayImage, element: &StructuringElement, passes: u32) -> GrayImage {
    if passes == 0 || element.is_identity() {
        return image.clone();
    }
    let eroded = repeat(image.clone(), element, passes, erode);
    repeat(eroded, element, passes, dilate)
}

/// Morphological closing: `passes` dilations, then `passes` erosions.
#[must_use = "returns the closed image"]
pub fn close(image: &GrayImage, element: &StructuringElement, passes: u32) -> GrayImage {
    if passes == 0 || element.is_identity() {
        return image.clone();
    }
    let dilated = repeat(image.clone(), element, passes, dilate);
    repeat(dilated, element, passes, erode)
}

/// Force every pixel to 0 or 255 around [`BINARY_THRESHOLD`].
#[must_use = "returns the binarized image"]
pub fn binarize(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] >= BINARY_THRESHOLD { 255 } else { 0 };
    }
    out
}

/// Run the full refinement chain on a binary mask.
///
/// 1. Coerce kernel extents and element size.
/// 2. Gaussian smoothing with the coerced kernel and sigma pair.
/// 3. Opening, then closing, `passes` times each.
/// 4. Re-binarize so the output is a clean 0/255 mask.
#[must_use = "returns the refined mask"]
pub fn refine(mask: &GrayImage, config: &MorphologyConfig) -> GrayImage {
    let kernel_x = coerce_kernel_extent(config.kernel_x, config.kernel_max);
    let kernel_y = coerce_kernel_extent(config.kernel_y, config.kernel_max);
    if (kernel_x, kernel_y) != (config.kernel_x, config.kernel_y) {
        tracing::trace!(
            requested_x = config.kernel_x,
            requested_y = config.kernel_y,
            kernel_x,
            kernel_y,
            "coerced gaussian kernel extents",
        );
    }
    let element =
        StructuringElement::new(config.shape, config.element_width, config.element_height);

    let smoothed = crate::blur::gaussian_blur_sized(
        mask,
        (kernel_x, kernel_y),
        (config.sigma_x, config.sigma_y),
    );
    let opened = open(&smoothed, &element, config.passes);
    let closed = close(&opened, &element, config.passes);
    binarize(&closed)
}
