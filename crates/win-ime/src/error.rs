//! Error types and result alias for the win-ime crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A Win32 call failed.
    #[error("OS error: {0}")]
    Os(String),
    /// A COM call (UI Automation, TSF) failed.
    #[error("COM error: {0}")]
    Com(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for Error {
    fn from(e: windows::core::Error) -> Self {
        Self::Com(e.message())
    }
}
