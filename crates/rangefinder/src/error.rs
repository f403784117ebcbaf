//! CLI error types.

use std::path::PathBuf;

use rangefinder_pipeline::{PipelineError, ShapeClass};

/// Exit status for startup and calibration failures.
pub const EXIT_STARTUP: u8 = 1;
/// Exit status when a frame could not be rendered.
pub const EXIT_RENDER: u8 = 2;

/// Errors that end a CLI command before or outside the frame loop.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON for [`rangefinder_pipeline::PipelineConfig`].
    #[error("invalid configuration in {}: {source}", path.display())]
    Config {
        /// The configuration file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The input holds no decodable frame files.
    #[error("no image frames found in {}", .0.display())]
    NoFrames(PathBuf),

    /// The calibration image contains no qualifying object.
    #[error("no object detected in {}", .0.display())]
    NoDetection(PathBuf),

    /// The detected calibration object has no rangeable width.
    #[error("detected shape {0} has no measurable width")]
    Unmeasurable(ShapeClass),

    /// Decoding or calibration failed inside the pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Writing output failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Serializing output failed.
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Render(_) => EXIT_RENDER,
            _ => EXIT_STARTUP,
        }
    }
}

/// Errors from presenting one tick.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The output directory could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        /// The directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An image could not be encoded.
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        /// The file.
        path: PathBuf,
        /// Underlying encoder error.
        #[source]
        source: image::ImageError,
    },

    /// The raster overlay could not be drawn.
    #[error(transparent)]
    Overlay(#[from] rangefinder_export::ExportError),

    /// A JSON record could not be serialized.
    #[error("failed to serialize frame record: {0}")]
    Json(#[from] serde_json::Error),

    /// Standard output was closed or failed.
    #[error("failed to write to output stream: {0}")]
    Stream(#[source] std::io::Error),
}
