//! Error types for configuration compilation.
//!
//! Only top-level failures surface as errors: an unreadable root config file
//! aborts the reload and keeps the prior graph. Everything below that level
//! (bad directives, missing includes, expression errors) is logged at the
//! offending line and absorbed, so a typo never silences the audio path.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a configuration compile.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The root configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }
}
