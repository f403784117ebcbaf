//! The frame loop and its collaborators.
//!
//! Capture, live controls, display, and cancellation all live outside
//! this crate. They plug in through four traits:
//!
//! - [`FrameSource`] yields raw frames until it runs out or fails.
//! - [`ControlSurface`] owns the live [`PipelineConfig`]; it is refreshed
//!   once per tick and only ever read by the pipeline.
//! - [`Renderer`] displays or stores each tick's [`FrameOutput`].
//! - [`StopSignal`] is polled once per tick with a bounded wait.
//!
//! [`run`] drives them strictly in sequence: one frame is fully
//! processed and presented before the next is pulled.

use std::time::Duration;

use crate::config::PipelineConfig;
use crate::diagnostics::{Clock, FrameDiagnostics};
use crate::types::{FrameOutput, RgbImage};

/// Default wait between ticks while polling for cancellation.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(30);

/// Why a frame source stopped producing frames.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source has no more frames (end of file, device closed).
    #[error("frame source exhausted")]
    Exhausted,

    /// Reading the next frame failed.
    #[error("failed to read frame: {0}")]
    Read(String),
}

/// A producer of raw frames.
pub trait FrameSource {
    /// Pull the next frame.
    ///
    /// # Errors
    ///
    /// [`SourceError::Exhausted`] when there are no more frames;
    /// [`SourceError::Read`] when a frame could not be produced.
    fn next_frame(&mut self) -> Result<RgbImage, SourceError>;
}

/// Owner of the live configuration.
pub trait ControlSurface {
    /// Pick up any changes made since the last tick.
    fn refresh(&mut self) {}

    /// The configuration for the current tick.
    fn current(&self) -> &PipelineConfig;
}

/// A fixed configuration is a control surface that never changes.
impl ControlSurface for PipelineConfig {
    fn current(&self) -> &PipelineConfig {
        self
    }
}

/// Everything handed to the renderer for one tick.
#[derive(Debug, Clone)]
pub struct Tick {
    /// Zero-based frame counter.
    pub index: u64,
    /// The configuration this frame was processed with.
    pub config: PipelineConfig,
    /// The pipeline's output.
    pub output: FrameOutput,
    /// Stage timing and counts for this tick.
    pub diagnostics: FrameDiagnostics,
}

/// A consumer of pipeline output.
pub trait Renderer {
    /// Error type for a failed presentation.
    type Error: std::error::Error;

    /// Display or store one tick.
    ///
    /// # Errors
    ///
    /// Any error ends the run and is returned from [`run`].
    fn present(&mut self, tick: &Tick) -> Result<(), Self::Error>;
}

/// Cooperative cancellation.
pub trait StopSignal {
    /// Wait up to `wait` for a stop request; `true` ends the run.
    fn should_stop(&mut self, wait: Duration) -> bool;
}

/// Why [`run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The frame source ran out of frames.
    SourceExhausted,
    /// The frame source failed; carries the error message.
    SourceFailed(String),
    /// The stop signal fired.
    Cancelled,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames processed and presented.
    pub frames: u64,
    /// Frames in which an object was selected.
    pub detections: u64,
    /// Why the loop ended.
    pub reason: StopReason,
}

/// Run the frame loop until the source ends or the stop signal fires.
///
/// Each tick: pull a frame, refresh the controls, run the pipeline,
/// present the result, then poll the stop signal for up to `wait`.
/// Source errors end the loop immediately with no retry.
///
/// # Errors
///
/// Returns the renderer's error if presenting a tick fails.
pub fn run<S, C, R, T, K>(
    source: &mut S,
    controls: &mut C,
    renderer: &mut R,
    stop: &mut T,
    clock: &K,
    wait: Duration,
) -> Result<RunSummary, R::Error>
where
    S: FrameSource,
    C: ControlSurface,
    R: Renderer,
    T: StopSignal,
    K: Clock,
{
    let mut frames = 0;
    let mut detections = 0;

    let reason = loop {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(SourceError::Exhausted) => {
                tracing::warn!(frames, "frame source exhausted");
                break StopReason::SourceExhausted;
            }
            Err(SourceError::Read(message)) => {
                tracing::error!(frames, %message, "frame source failed");
                break StopReason::SourceFailed(message);
            }
        };

        controls.refresh();
        let config = controls.current().clone();
        let (output, diagnostics) =
            crate::diagnostics::process_frame_with_diagnostics(frame, &config, clock);

        if let Some(detection) = &output.detection {
            detections += 1;
            tracing::debug!(
                frame = frames,
                shape = %detection.shape,
                area = detection.area,
                distance = ?detection.distance,
                "object detected"
            );
        } else {
            tracing::debug!(frame = frames, contours = output.contours.len(), "no object");
        }

        let tick = Tick {
            index: frames,
            config,
            output,
            diagnostics,
        };
        renderer.present(&tick)?;
        frames += 1;

        if stop.should_stop(wait) {
            tracing::info!(frames, "stop requested");
            break StopReason::Cancelled;
        }
    };

    Ok(RunSummary {
        frames,
        detections,
        reason,
    })
}
