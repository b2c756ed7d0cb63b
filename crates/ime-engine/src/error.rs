use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the IME engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors originating from OS input-method queries.
    #[error("IME query error: {0}")]
    Ops(#[from] win_ime::Error),

    /// Errors originating from the keyboard hook.
    #[error("Keyboard hook error: {0}")]
    Hook(#[from] win_hook::Error),

    /// Generic error with context.
    #[error("Engine error: {0}")]
    Msg(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_layer_errors_convert() {
        let e: Error = win_hook::Error::HookInstall.into();
        assert!(matches!(e, Error::Hook(win_hook::Error::HookInstall)));
        let e: Error = win_ime::Error::Os("GetForegroundWindow".into()).into();
        assert_eq!(e.to_string(), "IME query error: OS error: GetForegroundWindow");
    }
}
