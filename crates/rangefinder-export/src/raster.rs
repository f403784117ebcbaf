//! Raster overlay via tiny-skia.
//!
//! Strokes the same markers as [`crate::to_svg`] directly onto a copy of
//! the raw frame, anti-aliased, so the result can be saved as a PNG or
//! shown in a window. Text labels are left to the SVG overlay.

use image::{Rgb, RgbImage};
use rangefinder_pipeline::{Detection, FrameOutput, Point, ShapeClass};
use tiny_skia::{LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use crate::{
    BOX_COLOR, CIRCLE_COLOR, CONTOUR_COLOR, DETECTION_COLOR, ExportError, STROKE_WIDTH,
    pixel_center, shifted,
};

/// Build a tiny-skia path through `points`.
///
/// Returns `None` for fewer than 2 points or a degenerate path.
#[allow(clippy::cast_possible_truncation)]
fn polygon_path(points: &[Point], closed: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

#[allow(clippy::cast_possible_truncation)]
fn circle_path(center: Point, radius: f64) -> Option<Path> {
    PathBuilder::from_circle(
        (center.x + 0.5) as f32,
        (center.y + 0.5) as f32,
        radius as f32,
    )
}

fn detection_path(detection: &Detection) -> Option<Path> {
    let rect = detection.geometry.bounding_rect;
    let left = f64::from(rect.x) + 0.5;
    let top = f64::from(rect.y) + 0.5;
    let right = left + f64::from(rect.width.saturating_sub(1));
    let bottom = top + f64::from(rect.height.saturating_sub(1));
    polygon_path(
        &[
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ],
        true,
    )
}

/// Copy an RGB frame into an opaque pixmap.
fn frame_to_pixmap(frame: &RgbImage) -> Result<Pixmap, ExportError> {
    let (width, height) = frame.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::EmptyFrame { width, height })?;
    // Opaque pixels are identical premultiplied and straight.
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(frame.pixels()) {
        dst[..3].copy_from_slice(&src.0);
        dst[3] = 255;
    }
    Ok(pixmap)
}

/// Copy an opaque pixmap back into an RGB image.
fn pixmap_to_frame(pixmap: &Pixmap) -> RgbImage {
    let mut img = RgbImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
        *dst = Rgb([src[0], src[1], src[2]]);
    }
    img
}

/// Render the frame with every overlay marker stroked on top.
///
/// Draw order: contours, then rotated rectangles and enclosing circles
/// whose draw flags are set, then the selected object's bounding box
/// (plus its enclosing circle when it was classified as a circle).
/// Coordinates are pixel centers, matching the SVG overlay.
///
/// # Errors
///
/// Returns [`ExportError::EmptyFrame`] if the frame has zero width or
/// height.
pub fn render_overlay(output: &FrameOutput) -> Result<RgbImage, ExportError> {
    let mut pixmap = frame_to_pixmap(&output.frame)?;

    let stroke = Stroke {
        width: STROKE_WIDTH,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let mut draw = |path: Option<Path>, color: [u8; 3]| {
        let Some(path) = path else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], 255);
        paint.anti_alias = true;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    };

    for contour in &output.contours {
        let points: Vec<Point> = contour.points().iter().map(|&p| pixel_center(p)).collect();
        draw(polygon_path(&points, true), CONTOUR_COLOR);
    }

    for annotation in &output.annotations {
        if annotation.draw_box {
            let corners: Vec<Point> = annotation
                .rotated_rect
                .corners
                .iter()
                .map(|&c| shifted(c))
                .collect();
            draw(polygon_path(&corners, true), BOX_COLOR);
        }
        if annotation.draw_circle {
            let circle = annotation.enclosing_circle;
            draw(circle_path(circle.center, circle.radius), CIRCLE_COLOR);
        }
    }

    if let Some(detection) = &output.detection {
        draw(detection_path(detection), DETECTION_COLOR);
        if detection.shape == ShapeClass::Circle {
            let circle = detection.geometry.enclosing_circle;
            draw(circle_path(circle.center, circle.radius), DETECTION_COLOR);
        }
    }

    Ok(pixmap_to_frame(&pixmap))
}
