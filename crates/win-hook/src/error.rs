//! Error types and result alias for the win-hook crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying OS provided an error.
    #[error("OS error: {0}")]
    OsError(String),
    /// `SetWindowsHookExW` failed or the hook thread never reported ready.
    #[error("Keyboard hook failed to start")]
    HookInstall,
    /// `start` was called while a hook thread is already running.
    #[error("Keyboard hook already running")]
    AlreadyRunning,
    /// Low-level keyboard hooks only exist on Windows.
    #[error("Keyboard hooks are not supported on this platform")]
    Unsupported,
}
