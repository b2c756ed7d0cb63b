//! Mutable detection state owned by the reconciliation loop.

use std::time::Instant;

use win_ime::WindowId;

use crate::{Language, LanguageInfo, tracker::TrackerKind};

/// Per-language "the pixel verifier has the final word" flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelFlags {
    /// Japanese pixel verdict in effect.
    pub japanese: bool,
    /// Korean pixel verdict in effect.
    pub korean: bool,
    /// Chinese pixel verdict in effect.
    pub chinese: bool,
}

/// Everything the engine remembers between passes.
#[derive(Debug, Clone, Default)]
pub struct DetectionState {
    /// Engine-maintained IME state; the fallback of last resort.
    pub tracked: bool,
    /// Pixel verdict flags.
    pub use_pixel: PixelFlags,
    /// Japanese toggle keys set `tracked`; trust it over the OS.
    pub use_tracked_japanese: bool,
    /// Chinese toggle gestures set `tracked`; trust it over the OS.
    pub use_tracked_chinese: bool,
    /// Language the engine believes a terminal host is using.
    pub terminal_language: Option<Language>,
    /// A language switch happened in a terminal and the new language is not
    /// known yet.
    pub language_pending: bool,
    /// Last successful pixel verification.
    pub last_pixel_verification: Option<Instant>,
    /// Foreground window seen by the previous pass.
    pub last_foreground: WindowId,
    /// Last published snapshot.
    pub last_published: LanguageInfo,
}

impl DetectionState {
    /// Pixel flag for a tracker.
    pub fn pixel_flag(&mut self, kind: TrackerKind) -> &mut bool {
        match kind {
            TrackerKind::Japanese => &mut self.use_pixel.japanese,
            TrackerKind::Korean => &mut self.use_pixel.korean,
            TrackerKind::Chinese => &mut self.use_pixel.chinese,
        }
    }

    /// Flip the tracked state, returning the new value.
    pub fn toggle(&mut self) -> bool {
        self.tracked = !self.tracked;
        self.tracked
    }
}
