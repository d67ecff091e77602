//! Engine error types.
//!
//! Only initialization can fail; the audio path has no error channel and
//! reload errors are logged and absorbed (the prior graph stays active).

use thiserror::Error;

/// Errors surfaced to the engine owner.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The stream format passed to `initialize` is unusable.
    #[error("invalid stream format: {0}")]
    InvalidFormat(&'static str),
}
