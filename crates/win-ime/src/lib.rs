//! win-ime: Windows input-method queries for the IME engine.
//!
//! Windows has no single API that reports "which input language is active
//! and is its IME on" for an arbitrary foreground application. This crate
//! exposes the individual probes that each answer part of that question:
//! - window, thread and keyboard-layout lookups
//! - IMM32 open status and conversion mode, directly or via `WM_IME_CONTROL`
//! - TSF global compartments
//! - the taskbar input indicator, located through UI Automation and captured
//!   with GDI for pixel inspection
//!
//! Probes sit behind the [`ImeOps`] trait. [`RealImeOps`] exists on Windows
//! only; [`MockImeOps`] is available everywhere for tests.

mod error;
pub mod geom;
mod ops;
#[cfg(windows)]
mod sys;

pub use error::{Error, Result};
pub use geom::Rect;
#[cfg(windows)]
pub use ops::RealImeOps;
pub use ops::{
    AttachedProbe, Compartment, ImeOps, MockImeOps, MockImeState, WindowId, WindowProbe,
};

/// Known IME candidate and composition window classes.
pub const CANDIDATE_WINDOW_CLASSES: &[&str] = &[
    "UIWndClass",
    "CandidateWindow",
    "Microsoft.IME.UIManager.CandidateWindow",
    "IME_Candidate",
    "MSCTFIME UI",
    "IME",
    "IMECLASSUI",
];

/// Smallest candidate window side, in pixels, that counts as visible.
pub const MIN_CANDIDATE_SIDE: i32 = 10;

/// True if `class` equals or contains one of [`CANDIDATE_WINDOW_CLASSES`],
/// ignoring ASCII case.
pub fn is_candidate_class(class: &str) -> bool {
    let lower = class.to_ascii_lowercase();
    CANDIDATE_WINDOW_CLASSES
        .iter()
        .any(|hint| lower.contains(&hint.to_ascii_lowercase()))
}

/// Strip directory and extension from an executable path.
pub fn process_stem(path: &str) -> &str {
    let file = path.rsplit(['\\', '/']).next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_classes_match_loosely() {
        assert!(is_candidate_class("MSCTFIME UI"));
        assert!(is_candidate_class("msctfime ui"));
        assert!(is_candidate_class("Microsoft.IME.UIManager.CandidateWindow.Host"));
        assert!(is_candidate_class("SomeImeHost"));
        assert!(!is_candidate_class("Chrome_WidgetWin_1"));
    }

    #[test]
    fn process_stems() {
        assert_eq!(
            process_stem(r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe"),
            "powershell"
        );
        assert_eq!(process_stem("wezterm-gui.exe"), "wezterm-gui");
        assert_eq!(process_stem("cmd"), "cmd");
        assert_eq!(process_stem(".hidden"), ".hidden");
    }
}
