//! Error handling for the imewatch binary.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Convenient result type for imewatch operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can stop imewatch.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read or parsed.
    #[error("Configuration error in {path}: {message}")]
    Config {
        /// File that failed.
        path: PathBuf,
        /// Human-readable cause.
        message: String,
    },
    /// Errors surfaced by the detection engine.
    #[error("Engine error: {0}")]
    Engine(#[from] ime_engine::Error),
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
