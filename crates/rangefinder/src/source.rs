//! File-backed frame source.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rangefinder_pipeline::{FrameSource, RgbImage, SourceError};

use crate::error::CliError;

/// File extensions accepted as frames, compared case-insensitively.
const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Frames read from image files, in file-name order.
#[derive(Debug)]
pub struct ImageFiles {
    pending: VecDeque<PathBuf>,
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                FRAME_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
}

impl ImageFiles {
    /// Open a single image file or a directory of frames.
    ///
    /// Directory entries are filtered to known image extensions and
    /// sorted by file name. Subdirectories are ignored.
    ///
    /// # Errors
    ///
    /// [`CliError::Read`] if the path cannot be read;
    /// [`CliError::NoFrames`] if it yields no frame files.
    pub fn open(input: &Path) -> Result<Self, CliError> {
        let read_err = |source| CliError::Read {
            path: input.to_path_buf(),
            source,
        };
        let metadata = std::fs::metadata(input).map_err(read_err)?;

        let mut paths = if metadata.is_dir() {
            std::fs::read_dir(input)
                .map_err(read_err)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| is_frame_file(path))
                .collect()
        } else {
            vec![input.to_path_buf()]
        };
        paths.sort();

        if paths.is_empty() {
            return Err(CliError::NoFrames(input.to_path_buf()));
        }
        tracing::info!(input = %input.display(), frames = paths.len(), "opened frame source");
        Ok(Self {
            pending: paths.into(),
        })
    }

    /// Frames not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageFiles {
    fn next_frame(&mut self) -> Result<RgbImage, SourceError> {
        let path = self.pending.pop_front().ok_or(SourceError::Exhausted)?;
        tracing::debug!(path = %path.display(), "reading frame");
        let bytes = std::fs::read(&path)
            .map_err(|e| SourceError::Read(format!("{}: {e}", path.display())))?;
        rangefinder_pipeline::color::decode_frame(&bytes)
            .map_err(|e| SourceError::Read(format!("{}: {e}", path.display())))
    }
}
