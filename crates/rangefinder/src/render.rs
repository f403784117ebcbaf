//! File and stream renderer.
//!
//! For each tick, optionally writes numbered artifacts into an output
//! directory:
//!
//! - `NNNNN-mask.png`: the refined binary mask
//! - `NNNNN-overlay.png`: the frame with markers stroked on
//! - `NNNNN-overlay.svg`: the same markers plus the detection label
//! - `NNNNN-hsv.png`: the HSV image, when requested
//!
//! and optionally emits a one-line JSON record and/or the diagnostics
//! report per frame to an output stream.

use std::io::Write;
use std::path::{Path, PathBuf};

use rangefinder_export::SvgMetadata;
use rangefinder_pipeline::{BoundingRect, Renderer, ShapeClass, Tick};
use serde::Serialize;

use crate::error::RenderError;

/// What [`FileRenderer`] produces for each tick.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Directory for per-frame image artifacts; nothing is written when `None`.
    pub output_dir: Option<PathBuf>,
    /// Also write the HSV image.
    pub save_hsv: bool,
    /// Emit one JSON record per frame to the stream.
    pub json: bool,
    /// Emit the stage diagnostics report per frame to the stream.
    pub diagnostics: bool,
}

/// One line of `--json` output.
#[derive(Debug, Serialize)]
pub struct FrameRecord {
    /// Zero-based frame index.
    pub frame: u64,
    /// Number of extracted contours.
    pub contours: usize,
    /// The selected object, if any.
    pub detection: Option<DetectionRecord>,
    /// Wall time spent in the pipeline, in milliseconds.
    pub elapsed_ms: f64,
}

/// The parts of a detection worth logging per frame.
#[derive(Debug, Serialize)]
pub struct DetectionRecord {
    /// Shape class.
    pub shape: ShapeClass,
    /// Contour area in square pixels.
    pub area: f64,
    /// Polygon approximation vertex count.
    pub vertices: usize,
    /// Axis-aligned bounding box.
    pub bounding_rect: BoundingRect,
    /// Width used for ranging.
    pub pixel_width: Option<f64>,
    /// Estimated distance.
    pub distance: Option<f64>,
}

impl FrameRecord {
    /// Summarize one tick.
    #[must_use]
    pub fn from_tick(tick: &Tick) -> Self {
        Self {
            frame: tick.index,
            contours: tick.output.contours.len(),
            detection: tick.output.detection.as_ref().map(|d| DetectionRecord {
                shape: d.shape,
                area: d.area,
                vertices: d.approximation.vertex_count(),
                bounding_rect: d.geometry.bounding_rect,
                pixel_width: d.pixel_width,
                distance: d.distance,
            }),
            elapsed_ms: tick.diagnostics.total_duration.as_secs_f64() * 1000.0,
        }
    }
}

/// Renderer that writes image artifacts to disk and records to `out`.
///
/// Each SVG overlay embeds the configuration its own frame was processed
/// with, so edits picked up mid-run show in later overlays.
#[derive(Debug)]
pub struct FileRenderer<W> {
    options: RenderOptions,
    out: W,
    dir_ready: bool,
}

impl<W: Write> FileRenderer<W> {
    /// Create a renderer writing records to `out`.
    pub const fn new(options: RenderOptions, out: W) -> Self {
        Self {
            options,
            out,
            dir_ready: false,
        }
    }

    /// Consume the renderer and return its output stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn ensure_dir(&mut self, dir: &Path) -> Result<(), RenderError> {
        if !self.dir_ready {
            std::fs::create_dir_all(dir).map_err(|source| RenderError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
            self.dir_ready = true;
        }
        Ok(())
    }

    fn write_artifacts(&mut self, dir: &Path, tick: &Tick) -> Result<(), RenderError> {
        self.ensure_dir(dir)?;
        let stem = format!("{:05}", tick.index);
        let output = &tick.output;

        let mask_path = dir.join(format!("{stem}-mask.png"));
        output.mask.save(&mask_path).map_err(encode_error(&mask_path))?;

        let overlay = rangefinder_export::render_overlay(output)?;
        let overlay_path = dir.join(format!("{stem}-overlay.png"));
        overlay.save(&overlay_path).map_err(encode_error(&overlay_path))?;

        let description = output.detection.as_ref().map_or_else(
            || String::from("no object"),
            rangefinder_export::detection_label,
        );
        let title = format!("frame {stem}");
        let config_json = serde_json::to_string(&tick.config)?;
        let metadata = SvgMetadata {
            title: Some(&title),
            description: Some(&description),
            config_json: Some(&config_json),
        };
        let svg_path = dir.join(format!("{stem}-overlay.svg"));
        std::fs::write(&svg_path, rangefinder_export::to_svg(output, &metadata)).map_err(
            |source| RenderError::Write {
                path: svg_path.clone(),
                source,
            },
        )?;

        if self.options.save_hsv {
            let hsv_path = dir.join(format!("{stem}-hsv.png"));
            output.hsv.save(&hsv_path).map_err(encode_error(&hsv_path))?;
        }
        Ok(())
    }
}

fn encode_error(path: &Path) -> impl FnOnce(image::ImageError) -> RenderError + '_ {
    move |source| RenderError::Encode {
        path: path.to_path_buf(),
        source,
    }
}

impl<W: Write> Renderer for FileRenderer<W> {
    type Error = RenderError;

    fn present(&mut self, tick: &Tick) -> Result<(), RenderError> {
        if let Some(dir) = self.options.output_dir.clone() {
            self.write_artifacts(&dir, tick)?;
        }

        match &tick.output.detection {
            Some(detection) => tracing::info!(
                frame = tick.index,
                shape = %detection.shape,
                distance = ?detection.distance,
                "object"
            ),
            None => tracing::info!(frame = tick.index, "no object"),
        }

        if self.options.json {
            let line = serde_json::to_string(&FrameRecord::from_tick(tick))?;
            writeln!(self.out, "{line}").map_err(RenderError::Stream)?;
        }
        if self.options.diagnostics {
            writeln!(self.out, "{}", tick.diagnostics.report()).map_err(RenderError::Stream)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;
    use rangefinder_pipeline::diagnostics::process_frame_with_diagnostics;
    use rangefinder_pipeline::{ChannelBounds, DenoiseFilter, PipelineConfig, RgbImage};

    use super::*;
    use crate::StdClock;

    fn tick(index: u64, with_object: bool) -> Tick {
        let frame = RgbImage::from_fn(60, 40, |x, y| {
            if with_object && (10..30).contains(&x) && (10..30).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let mut config = PipelineConfig {
            denoise: DenoiseFilter::Disabled,
            hsv_smoothing: false,
            ..PipelineConfig::default()
        };
        config.segmentation.value = ChannelBounds::new(128, 255);
        let (output, diagnostics) = process_frame_with_diagnostics(frame, &config, &StdClock);
        Tick {
            index,
            config,
            output,
            diagnostics,
        }
    }

    #[test]
    fn writes_numbered_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let options = RenderOptions {
            output_dir: Some(out_dir.clone()),
            save_hsv: true,
            ..RenderOptions::default()
        };
        let mut renderer = FileRenderer::new(options, Vec::new());
        renderer.present(&tick(7, true)).unwrap();

        for name in [
            "00007-mask.png",
            "00007-overlay.png",
            "00007-overlay.svg",
            "00007-hsv.png",
        ] {
            assert!(out_dir.join(name).is_file(), "missing {name}");
        }
        let mask = image::open(out_dir.join("00007-mask.png")).unwrap().to_luma8();
        assert_eq!(mask.get_pixel(20, 20).0[0], 255);
        let svg = std::fs::read_to_string(out_dir.join("00007-overlay.svg")).unwrap();
        assert!(svg.contains("<title>frame 00007</title>"));
        assert!(svg.contains(r#""hsv_smoothing":false"#));
        assert!(renderer.into_inner().is_empty());
    }

    #[test]
    fn hsv_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let options = RenderOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..RenderOptions::default()
        };
        let mut renderer = FileRenderer::new(options, Vec::new());
        renderer.present(&tick(0, false)).unwrap();
        assert!(dir.path().join("00000-mask.png").is_file());
        assert!(!dir.path().join("00000-hsv.png").exists());
    }

    #[test]
    fn json_records_one_line_per_frame() {
        let options = RenderOptions {
            json: true,
            ..RenderOptions::default()
        };
        let mut renderer = FileRenderer::new(options, Vec::new());
        renderer.present(&tick(0, true)).unwrap();
        renderer.present(&tick(1, false)).unwrap();

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["frame"], 0);
        assert_eq!(lines[0]["detection"]["shape"], "rectangle");
        assert_eq!(lines[0]["detection"]["bounding_rect"]["width"], 20);
        assert!((lines[0]["detection"]["distance"].as_f64().unwrap() - 99.75).abs() < 1e-9);
        assert!(lines[1]["detection"].is_null());
    }

    #[test]
    fn diagnostics_report_is_streamed() {
        let options = RenderOptions {
            diagnostics: true,
            ..RenderOptions::default()
        };
        let mut renderer = FileRenderer::new(options, Vec::new());
        renderer.present(&tick(0, true)).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("Frame Diagnostics Report"));
    }

    #[test]
    fn unwritable_output_dir_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "occupied").unwrap();
        let options = RenderOptions {
            output_dir: Some(blocker.join("out")),
            ..RenderOptions::default()
        };
        let mut renderer = FileRenderer::new(options, Vec::new());
        assert!(matches!(
            renderer.present(&tick(0, true)),
            Err(RenderError::CreateDir { .. })
        ));
    }
}
