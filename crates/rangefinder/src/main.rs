//! rangefinder: run the color-segmentation rangefinder over image frames.
//!
//! Each frame is thresholded in HSV, the largest matching region is
//! classified as a rectangle or circle, and its distance is estimated
//! from its apparent width. Frames come from an image file or a
//! directory of images; the live configuration comes from a JSON file
//! that can be edited while the run is in progress.
//!
//! # Usage
//!
//! ```text
//! rangefinder run frames/ --config live.json --watch-config --output-dir out/
//! rangefinder calibrate reference.png --known-distance 19.95
//! rangefinder default-config > live.json
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).
//! Ctrl-C stops a run after the frame in progress and exits cleanly.

#![allow(clippy::print_stdout)]

mod calibrate;
mod controls;
mod error;
mod render;
mod source;
mod stop;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use rangefinder_pipeline::diagnostics::Clock;
use rangefinder_pipeline::tick::{self, StopReason};
use rangefinder_pipeline::{ControlSurface, PipelineConfig};

use crate::controls::JsonControls;
use crate::error::CliError;
use crate::render::{FileRenderer, RenderOptions};
use crate::source::ImageFiles;
use crate::stop::StopControl;

/// Color-segmentation shape detector with single-camera distance estimation.
#[derive(Parser)]
#[command(name = "rangefinder", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process frames from an image file or directory.
    Run(RunArgs),
    /// Derive the calibration constant from a reference shot.
    Calibrate(CalibrateArgs),
    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Image file, or directory of frames processed in file-name order.
    input: PathBuf,

    /// Write mask, overlay, and SVG artifacts for each frame here.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Pipeline configuration JSON; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Re-read the configuration file whenever it changes.
    #[arg(long, requires = "config")]
    watch_config: bool,

    /// Stop after this many frames.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u64>::new().range(1..))]
    max_frames: Option<u64>,

    /// Pause between frames, in milliseconds.
    #[arg(long, default_value_t = 30)]
    wait_ms: u64,

    /// Also write the HSV image for each frame.
    #[arg(long, requires = "output_dir")]
    save_hsv: bool,

    /// Print one JSON record per frame to stdout.
    #[arg(long)]
    json: bool,

    /// Print the stage timing report for each frame to stdout.
    #[arg(long)]
    diagnostics: bool,
}

#[derive(Args)]
struct CalibrateArgs {
    /// Image of the reference object.
    image: PathBuf,

    /// Distance the reference shot was taken at.
    #[arg(long)]
    known_distance: f64,

    /// Physical width of the reference object (defaults to the configured one).
    #[arg(long)]
    reference_width: Option<f64>,

    /// Use this apparent width in pixels instead of measuring the image.
    #[arg(long)]
    pixel_width: Option<f64>,

    /// Pipeline configuration JSON used to segment the image.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    path.map_or_else(|| Ok(PipelineConfig::default()), controls::read_config)
}

fn run(args: &RunArgs, interrupted: Arc<AtomicBool>) -> Result<(), CliError> {
    let mut source = ImageFiles::open(&args.input)?;
    let mut controls = match &args.config {
        Some(path) => JsonControls::load(path, args.watch_config)?,
        None => JsonControls::fixed(PipelineConfig::default()),
    };

    let options = RenderOptions {
        output_dir: args.output_dir.clone(),
        save_hsv: args.save_hsv,
        json: args.json,
        diagnostics: args.diagnostics,
    };
    let mut renderer = FileRenderer::new(options, std::io::stdout().lock());
    let mut stop = StopControl::new(args.max_frames, interrupted);

    let summary = tick::run(
        &mut source,
        &mut controls,
        &mut renderer,
        &mut stop,
        &StdClock,
        Duration::from_millis(args.wait_ms),
    )?;

    match &summary.reason {
        StopReason::SourceExhausted => {}
        StopReason::Cancelled if stop.was_interrupted() => tracing::info!("interrupted"),
        StopReason::Cancelled => tracing::info!("frame limit reached"),
        StopReason::SourceFailed(message) => {
            tracing::warn!(%message, "stopped on unreadable frame");
        }
    }
    tracing::info!(
        frames = summary.frames,
        detections = summary.detections,
        "run finished"
    );
    Ok(())
}

fn run_calibrate(args: &CalibrateArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let calibration = calibrate::calibrate(
        &args.image,
        &config,
        args.known_distance,
        args.reference_width,
        args.pixel_width,
    )?;
    tracing::info!(
        calibration_constant = calibration.calibration_constant,
        "calibrated"
    );
    println!("{}", serde_json::to_string_pretty(&calibration)?);
    Ok(())
}

fn run_default_config() -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Run(args) => {
            let interrupted = Arc::new(AtomicBool::new(false));
            if let Err(error) = stop::install_interrupt_handler(Arc::clone(&interrupted)) {
                tracing::warn!(%error, "Ctrl-C handler unavailable");
            }
            run(args, interrupted)
        }
        Command::Calibrate(args) => run_calibrate(args),
        Command::DefaultConfig => run_default_config(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::from(e.exit_status())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs::File;
    use std::sync::atomic::Ordering;
    use std::time::SystemTime;

    use clap::CommandFactory;
    use image::Rgb;
    use rangefinder_pipeline::RgbImage;
    use rangefinder_pipeline::tick::{FrameSource, SourceError};

    use super::*;

    fn not_interrupted() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn square_frame(shift: u32) -> RgbImage {
        RgbImage::from_fn(40, 40, |x, y| {
            if x >= 10 + shift && x < 30 && (10..30).contains(&y) {
                Rgb([250, 250, 250])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn run_args(input: PathBuf, output_dir: PathBuf) -> RunArgs {
        RunArgs {
            input,
            output_dir: Some(output_dir),
            config: None,
            watch_config: false,
            max_frames: None,
            wait_ms: 0,
            save_hsv: false,
            json: false,
            diagnostics: false,
        }
    }

    fn write_pinned(path: &Path, json: &str, secs: u64) {
        std::fs::write(path, json).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "rangefinder",
            "run",
            "frames",
            "--config",
            "live.json",
            "--watch-config",
            "--max-frames",
            "5",
            "--wait-ms",
            "0",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            unreachable!("parsed a different subcommand");
        };
        assert_eq!(args.input, PathBuf::from("frames"));
        assert!(args.watch_config);
        assert_eq!(args.max_frames, Some(5));
        assert_eq!(args.wait_ms, 0);
    }

    #[test]
    fn watch_requires_config() {
        assert!(Cli::try_parse_from(["rangefinder", "run", "frames", "--watch-config"]).is_err());
    }

    #[test]
    fn zero_frame_limit_is_rejected() {
        let parsed = Cli::try_parse_from(["rangefinder", "run", "frames", "--max-frames", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn run_writes_artifacts_for_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("frames");
        std::fs::create_dir(&frames).unwrap();
        for i in 0..3u32 {
            RgbImage::from_fn(40, 40, |x, y| {
                if x >= 10 + i && x < 30 && (10..30).contains(&y) {
                    Rgb([250, 250, 250])
                } else {
                    Rgb([0, 0, 0])
                }
            })
            .save(frames.join(format!("frame-{i}.png")))
            .unwrap();
        }
        let out = dir.path().join("out");
        let args = run_args(frames, out.clone());
        run(&args, not_interrupted()).unwrap();
        for i in 0..3 {
            assert!(out.join(format!("{i:05}-overlay.png")).is_file());
        }
        assert!(!out.join("00003-overlay.png").exists());
    }

    #[test]
    fn interrupt_ends_run_cleanly_after_current_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("frames");
        std::fs::create_dir(&frames).unwrap();
        for i in 0..3u32 {
            square_frame(i)
                .save(frames.join(format!("frame-{i}.png")))
                .unwrap();
        }
        let out = dir.path().join("out");
        let mut args = run_args(frames, out.clone());
        args.wait_ms = 60_000;

        let interrupted = not_interrupted();
        interrupted.store(true, Ordering::SeqCst);
        run(&args, interrupted).unwrap();

        assert!(out.join("00000-overlay.png").is_file());
        assert!(!out.join("00001-overlay.png").exists());
    }

    /// Serves the same frame forever, rewriting the config file just
    /// before the second one is pulled.
    struct EditingSource {
        pulled: u32,
        config: PathBuf,
    }

    impl FrameSource for EditingSource {
        fn next_frame(&mut self) -> Result<RgbImage, SourceError> {
            if self.pulled == 1 {
                write_pinned(
                    &self.config,
                    r#"{"segmentation": {"hue": {"low": 100, "high": 120}}}"#,
                    2,
                );
            }
            self.pulled += 1;
            Ok(square_frame(0))
        }
    }

    #[test]
    fn overlays_embed_the_config_in_force_for_their_frame() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("live.json");
        write_pinned(&config, "{}", 1);
        let out = dir.path().join("out");

        let mut source = EditingSource {
            pulled: 0,
            config: config.clone(),
        };
        let mut controls = JsonControls::load(&config, true).unwrap();
        let options = RenderOptions {
            output_dir: Some(out.clone()),
            ..RenderOptions::default()
        };
        let mut renderer = FileRenderer::new(options, Vec::new());
        let mut stop = StopControl::new(Some(2), not_interrupted());
        let summary = tick::run(
            &mut source,
            &mut controls,
            &mut renderer,
            &mut stop,
            &StdClock,
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(summary.frames, 2);

        let first = std::fs::read_to_string(out.join("00000-overlay.svg")).unwrap();
        let second = std::fs::read_to_string(out.join("00001-overlay.svg")).unwrap();
        assert!(first.contains(r#""hue":{"low":0,"high":179}"#));
        assert!(second.contains(r#""hue":{"low":100,"high":120}"#));
    }

    #[test]
    fn run_with_bad_config_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.png");
        RgbImage::new(4, 4).save(&frame).unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(&config, "not json").unwrap();
        let args = RunArgs {
            input: frame,
            output_dir: None,
            config: Some(config),
            watch_config: false,
            max_frames: Some(1),
            wait_ms: 0,
            save_hsv: false,
            json: false,
            diagnostics: false,
        };
        let err = run(&args, not_interrupted()).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.exit_status(), crate::error::EXIT_STARTUP);
    }

    #[test]
    fn render_failure_exits_with_render_status() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.png");
        RgbImage::new(4, 4).save(&frame).unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let args = RunArgs {
            input: frame,
            output_dir: Some(blocker.join("out")),
            config: None,
            watch_config: false,
            max_frames: None,
            wait_ms: 0,
            save_hsv: false,
            json: false,
            diagnostics: false,
        };
        let err = run(&args, not_interrupted()).unwrap_err();
        assert_eq!(err.exit_status(), crate::error::EXIT_RENDER);
    }
}
