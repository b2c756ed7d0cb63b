//! Visual IME state verification.
//!
//! The taskbar input indicator draws a mode glyph (あ/A, 가/A, 中/英). Its
//! ink density differs between modes, so the share of dark pixels in a
//! capture of the indicator tells on from off when no API can be trusted.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::debug;
use win_ime::{ImeOps, Rect};

use crate::Language;

/// How long a located indicator rectangle is reused.
pub const RECT_CACHE_TTL: Duration = Duration::from_secs(10);
/// How long a pixel verdict is reused.
pub const RESULT_CACHE_TTL: Duration = Duration::from_millis(200);
/// Smallest usable indicator side.
const MIN_RECT_SIDE: i32 = 5;
/// Margin subtracted from each side before the sample-size check.
const SAMPLE_MARGIN: usize = 1;
/// Smallest sample side after the margin.
const MIN_SAMPLE_SIDE: usize = 3;
/// A channel below this value makes a pixel "dark".
const DARK_CHANNEL: u8 = 200;
/// Japanese: more ink (あ) than off (A).
const JAPANESE_ON_ABOVE: f64 = 0.075;
/// Korean and Chinese: less ink (가, 中) than off (A, 英).
const HANGUL_HANZI_ON_BELOW: f64 = 0.06;

/// Fraction of dark pixels in a top-down BGRA buffer of `width` × `height`.
///
/// Returns `None` when the buffer is too small for the dimensions or the
/// area left after a one-pixel margin is under 3×3.
pub fn dark_ratio(pixels: &[u8], width: usize, height: usize) -> Option<f64> {
    let sample_w = width.checked_sub(2 * SAMPLE_MARGIN)?;
    let sample_h = height.checked_sub(2 * SAMPLE_MARGIN)?;
    if sample_w < MIN_SAMPLE_SIDE || sample_h < MIN_SAMPLE_SIDE {
        return None;
    }
    let total = width * height;
    let bytes = pixels.get(..total * 4)?;
    let dark = bytes
        .chunks_exact(4)
        .filter(|px| px[..3].iter().any(|c| *c < DARK_CHANNEL))
        .count();
    Some(dark as f64 / total as f64)
}

/// Map a dark ratio to on/off for `language`; `None` for languages without a
/// calibrated glyph.
pub fn classify_ratio(language: Language, ratio: f64) -> Option<bool> {
    match language {
        Language::Japanese => Some(ratio > JAPANESE_ON_ABOVE),
        Language::Korean | Language::ChineseSimplified | Language::ChineseTraditional => {
            Some(ratio < HANGUL_HANZI_ON_BELOW)
        }
        _ => None,
    }
}

/// Locates and reads the input indicator, with two independent caches.
pub struct PixelVerifier {
    /// OS access for locating and capturing.
    ops: Arc<dyn ImeOps>,
    /// Accessible names identifying the indicator.
    names: Vec<String>,
    /// Last located rectangle and when it was found.
    rect: Option<(Rect, Instant)>,
    /// Last verdict, the language it was read for, and when.
    result: Option<(Language, bool, Instant)>,
}

impl PixelVerifier {
    /// Create a verifier that looks for an indicator named like `names`.
    pub fn new(ops: Arc<dyn ImeOps>, names: Vec<String>) -> Self {
        Self {
            ops,
            names,
            rect: None,
            result: None,
        }
    }

    /// Indicator rectangle, located at most every [`RECT_CACHE_TTL`].
    pub fn locate(&mut self, now: Instant) -> Option<Rect> {
        if let Some((r, at)) = self.rect
            && !r.is_empty()
            && now.saturating_duration_since(at) < RECT_CACHE_TTL
        {
            return Some(r);
        }
        self.rect = None;
        match self.ops.find_input_indicator(&self.names) {
            Ok(Some(r)) if !r.is_empty() => {
                self.rect = Some((r, now));
                Some(r)
            }
            Ok(_) => {
                debug!("input_indicator_missing");
                None
            }
            Err(e) => {
                debug!(error = %e, "input_indicator_lookup_failed");
                None
            }
        }
    }

    /// Read the IME state for `language` from the indicator glyph.
    pub fn detect(&mut self, language: Language, now: Instant) -> Option<bool> {
        if !language.has_indicator_glyph() {
            return None;
        }
        if let Some((cached, v, at)) = self.result
            && cached == language
            && now.saturating_duration_since(at) < RESULT_CACHE_TTL
        {
            return Some(v);
        }
        let rect = self.locate(now)?;
        if !rect.at_least(MIN_RECT_SIDE) {
            debug!(?rect, "input_indicator_too_small");
            return None;
        }
        let pixels = match self.ops.capture_region(rect) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "indicator_capture_failed");
                return None;
            }
        };
        let Some(ratio) = dark_ratio(&pixels, rect.width as usize, rect.height as usize) else {
            debug!(?rect, len = pixels.len(), "indicator_sample_unusable");
            return None;
        };
        let on = classify_ratio(language, ratio)?;
        debug!(%language, ratio, on, "pixel_verdict");
        self.result = Some((language, on, now));
        Some(on)
    }

    /// Forget the located rectangle and the last verdict.
    pub fn clear_cache(&mut self) {
        self.rect = None;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use win_ime::MockImeOps;

    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    /// `w × h` buffer whose first `dark` pixels are black.
    fn img(w: usize, h: usize, dark: usize) -> Vec<u8> {
        (0..w * h)
            .flat_map(|i| if i < dark { BLACK } else { WHITE })
            .collect()
    }

    #[test]
    fn any_channel_below_threshold_is_dark() {
        let mut px = img(5, 5, 0);
        px[0] = 199; // blue
        px[4 + 1] = 199; // green
        px[8 + 2] = 199; // red
        px[12..15].copy_from_slice(&[200, 200, 200]);
        assert_eq!(dark_ratio(&px, 5, 5), Some(3.0 / 25.0));
    }

    #[test]
    fn tiny_or_short_buffers_are_rejected() {
        assert_eq!(dark_ratio(&img(4, 10, 0), 4, 10), None);
        assert_eq!(dark_ratio(&img(10, 4, 0), 10, 4), None);
        assert_eq!(dark_ratio(&img(1, 1, 0), 1, 1), None);
        assert_eq!(dark_ratio(&img(5, 5, 0)[..90], 5, 5), None);
        assert_eq!(dark_ratio(&img(5, 5, 0), 5, 5), Some(0.0));
    }

    #[test]
    fn calibration_edges() {
        assert_eq!(classify_ratio(Language::Japanese, 0.074), Some(false));
        assert_eq!(classify_ratio(Language::Japanese, 0.076), Some(true));
        assert_eq!(classify_ratio(Language::Korean, 0.059), Some(true));
        assert_eq!(classify_ratio(Language::Korean, 0.061), Some(false));
        assert_eq!(classify_ratio(Language::ChineseSimplified, 0.059), Some(true));
        assert_eq!(classify_ratio(Language::ChineseTraditional, 0.061), Some(false));
        assert_eq!(classify_ratio(Language::Thai, 0.5), None);
    }

    fn verifier(ops: &MockImeOps) -> PixelVerifier {
        PixelVerifier::new(Arc::new(ops.clone()), vec!["Input indicator".into()])
    }

    #[test]
    fn detect_japanese_from_glyph_density() {
        let ops = MockImeOps::new();
        // 1000 px, 76 dark → 7.6%
        ops.set_indicator(Some(Rect::new(0, 0, 40, 25)), Some(img(40, 25, 76)));
        let mut v = verifier(&ops);
        let t0 = Instant::now();
        assert_eq!(v.detect(Language::Japanese, t0), Some(true));

        ops.set_indicator(Some(Rect::new(0, 0, 40, 25)), Some(img(40, 25, 74)));
        // Cached verdict inside 200 ms.
        assert_eq!(
            v.detect(Language::Japanese, t0 + Duration::from_millis(150)),
            Some(true)
        );
        assert_eq!(ops.call_count("capture_region"), 1);
        assert_eq!(
            v.detect(Language::Japanese, t0 + Duration::from_millis(250)),
            Some(false)
        );
    }

    #[test]
    fn language_change_bypasses_cached_verdict() {
        let ops = MockImeOps::new();
        // 5% ink: off for Japanese, on for Korean.
        ops.set_indicator(Some(Rect::new(0, 0, 40, 25)), Some(img(40, 25, 50)));
        let mut v = verifier(&ops);
        let t0 = Instant::now();
        assert_eq!(v.detect(Language::Japanese, t0), Some(false));
        assert_eq!(
            v.detect(Language::Korean, t0 + Duration::from_millis(50)),
            Some(true)
        );
        assert_eq!(ops.call_count("capture_region"), 2);
        assert_eq!(
            v.detect(Language::Korean, t0 + Duration::from_millis(100)),
            Some(true)
        );
        assert_eq!(ops.call_count("capture_region"), 2);
    }

    #[test]
    fn rect_is_cached_for_ten_seconds() {
        let ops = MockImeOps::new();
        ops.set_indicator(Some(Rect::new(0, 0, 10, 10)), Some(img(10, 10, 0)));
        let mut v = verifier(&ops);
        let t0 = Instant::now();
        assert!(v.locate(t0).is_some());
        assert!(v.locate(t0 + Duration::from_secs(9)).is_some());
        assert_eq!(ops.call_count("find_input_indicator"), 1);
        assert!(v.locate(t0 + Duration::from_secs(10)).is_some());
        assert_eq!(ops.call_count("find_input_indicator"), 2);
    }

    #[test]
    fn missing_indicator_is_retried_every_time() {
        let ops = MockImeOps::new();
        let mut v = verifier(&ops);
        let t0 = Instant::now();
        assert_eq!(v.locate(t0), None);
        assert_eq!(v.locate(t0), None);
        assert_eq!(ops.call_count("find_input_indicator"), 2);
    }

    #[test]
    fn failures_yield_none() {
        let ops = MockImeOps::new();
        let mut v = verifier(&ops);
        let now = Instant::now();
        assert_eq!(v.detect(Language::Korean, now), None);

        ops.set_indicator(Some(Rect::new(0, 0, 4, 30)), Some(img(4, 30, 0)));
        v.clear_cache();
        assert_eq!(v.detect(Language::Korean, now), None);

        ops.set_indicator(Some(Rect::new(0, 0, 30, 30)), None);
        v.clear_cache();
        assert_eq!(v.detect(Language::Korean, now), None);
    }

    #[test]
    fn non_glyph_language_skips_capture() {
        let ops = MockImeOps::new();
        ops.set_indicator(Some(Rect::new(0, 0, 10, 10)), Some(img(10, 10, 0)));
        let mut v = verifier(&ops);
        assert_eq!(v.detect(Language::Thai, Instant::now()), None);
        assert!(!ops.calls_contains("find_input_indicator"));
    }
}
