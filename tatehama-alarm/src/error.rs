//! Error types for the alarm engine
//!
//! The taxonomy follows how failures are handled at runtime: device errors
//! are fatal to the engine, asset load errors skip one file, and playback
//! errors are swallowed by the reconciliation loop.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the alarm engine
#[derive(Error, Debug)]
pub enum Error {
    /// Audio device or output stream could not be created
    #[error("Audio device error: {0}")]
    Device(String),

    /// A sound file could not be opened or decoded
    #[error("Failed to load sound {}: {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    /// Voice was in an unexpected state for the requested operation
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration and shared-state errors
    #[error(transparent)]
    Common(#[from] tatehama_common::Error),
}

impl Error {
    pub(crate) fn asset_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::AssetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience Result type using the alarm engine Error
pub type Result<T> = std::result::Result<T, Error>;
