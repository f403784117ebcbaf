//! JSON-file control surface.
//!
//! Stands in for a window of sliders: the configuration lives in a JSON
//! file that can be edited while frames are running. With watching
//! enabled, the file is re-read whenever its modification time changes.
//! A bad edit is logged and the previous configuration stays in force.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rangefinder_pipeline::{ControlSurface, PipelineConfig};

use crate::error::CliError;

/// Read a [`PipelineConfig`] from a JSON file.
///
/// Missing fields take their defaults.
///
/// # Errors
///
/// [`CliError::Read`] if the file cannot be read;
/// [`CliError::Config`] if it is not a valid configuration.
pub fn read_config(path: &Path) -> Result<PipelineConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A configuration loaded from a JSON file, optionally watched.
#[derive(Debug)]
pub struct JsonControls {
    config: PipelineConfig,
    watched: Option<Watched>,
}

#[derive(Debug)]
struct Watched {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl JsonControls {
    /// A surface that always returns `config`.
    #[must_use]
    pub const fn fixed(config: PipelineConfig) -> Self {
        Self {
            config,
            watched: None,
        }
    }

    /// Load the configuration from `path`, watching it for edits when
    /// `watch` is set.
    ///
    /// # Errors
    ///
    /// Fails if the initial read or parse fails; later reload failures
    /// are only logged.
    pub fn load(path: &Path, watch: bool) -> Result<Self, CliError> {
        let modified = modified(path);
        let config = read_config(path)?;
        tracing::info!(path = %path.display(), watch, "loaded configuration");
        Ok(Self {
            config,
            watched: watch.then(|| Watched {
                path: path.to_path_buf(),
                modified,
            }),
        })
    }
}

impl ControlSurface for JsonControls {
    fn refresh(&mut self) {
        let Some(watched) = &mut self.watched else {
            return;
        };
        let now = modified(&watched.path);
        if now == watched.modified {
            return;
        }
        watched.modified = now;

        match read_config(&watched.path) {
            Ok(config) => {
                if config != self.config {
                    tracing::info!(path = %watched.path.display(), "configuration reloaded");
                }
                self.config = config;
            }
            Err(error) => {
                tracing::warn!(%error, "keeping previous configuration");
            }
        }
    }

    fn current(&self) -> &PipelineConfig {
        &self.config
    }
}
