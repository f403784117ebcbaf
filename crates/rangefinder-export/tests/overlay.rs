//! Pipeline output through both overlay renderers.

#![allow(clippy::unwrap_used)]

use image::Rgb;
use rangefinder_export::{SvgMetadata, render_overlay, to_svg};
use rangefinder_pipeline::{
    ChannelBounds, DenoiseFilter, FrameOutput, PipelineConfig, RgbImage, ShapeClass,
};

fn config() -> PipelineConfig {
    let mut config = PipelineConfig {
        denoise: DenoiseFilter::Disabled,
        hsv_smoothing: false,
        ..PipelineConfig::default()
    };
    config.segmentation.value = ChannelBounds::new(128, 255);
    config.stages.annotate_contours = true;
    config
}

fn disc_frame() -> RgbImage {
    RgbImage::from_fn(160, 160, |x, y| {
        let dx = f64::from(x) - 80.0;
        let dy = f64::from(y) - 80.0;
        if dx.hypot(dy) <= 50.0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

fn disc_output() -> FrameOutput {
    rangefinder_pipeline::process_frame(disc_frame(), &config())
}

#[test]
fn disc_overlay_svg_labels_circle() {
    let output = disc_output();
    let detection = output.detection.as_ref().unwrap();
    assert_eq!(detection.shape, ShapeClass::Circle);

    let svg = to_svg(&output, &SvgMetadata::default());
    assert!(svg.contains(r#"viewBox="0 0 160 160""#));
    assert!(svg.contains(r#"data-shape="Circle""#));
    assert!(svg.contains("<circle"));
    assert!(svg.contains(r##"stroke="#00ff00""##));
}

#[test]
fn disc_overlay_raster_marks_the_outline() {
    let output = disc_output();
    let overlay = render_overlay(&output).unwrap();
    assert_eq!(overlay.dimensions(), (160, 160));

    // Far corner is untouched background.
    assert_eq!(overlay.get_pixel(2, 2), &Rgb([0, 0, 0]));
    // Disc interior is untouched foreground.
    assert_eq!(overlay.get_pixel(80, 80), &Rgb([255, 255, 255]));
    // Something was stroked along the rim.
    let changed = overlay
        .enumerate_pixels()
        .filter(|&(x, y, p)| p != output.frame.get_pixel(x, y))
        .count();
    assert!(changed > 0);
}

#[test]
fn empty_scene_renders_frame_unchanged() {
    let frame = RgbImage::from_pixel(32, 24, Rgb([10, 20, 30]));
    let output = rangefinder_pipeline::process_frame(frame.clone(), &config());
    assert!(output.detection.is_none());

    let overlay = render_overlay(&output).unwrap();
    assert_eq!(overlay, frame);
    assert!(!to_svg(&output, &SvgMetadata::default()).contains(r#"id="detection""#));
}
