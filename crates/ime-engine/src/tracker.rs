//! Per-language IME state strategies.
//!
//! Japanese, Korean and Chinese IMEs each lie to the OS APIs in their own
//! way. A tracker reconciles the OS answer with the pixel verifier, the
//! engine's tracked state and, for Korean, the per-window cache.

use std::time::{Duration, Instant};

use tracing::{debug, trace};
use win_ime::{ImeOps, WindowId};

use crate::{
    Language, LanguageInfo, PixelVerifier, WindowStateCache, query, query::Resolved,
    state::DetectionState,
};

/// Which tracker owns a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerKind {
    /// Japanese IMEs.
    Japanese,
    /// Korean IMEs.
    Korean,
    /// Simplified and Traditional Chinese IMEs.
    Chinese,
}

impl TrackerKind {
    /// Tracker for `language`, if it has one.
    pub fn for_language(language: Language) -> Option<Self> {
        match language {
            Language::Japanese => Some(Self::Japanese),
            Language::Korean => Some(Self::Korean),
            l if l.is_chinese() => Some(Self::Chinese),
            _ => None,
        }
    }

    /// Run this kind's tracker for one pass.
    pub fn evaluate(self, cx: &mut TrackerCx<'_>) -> LanguageInfo {
        match self {
            Self::Japanese => JapaneseTracker.evaluate(cx),
            Self::Korean => KoreanTracker.evaluate(cx),
            Self::Chinese => ChineseTracker.evaluate(cx),
        }
    }
}

/// Everything a tracker may read or update during one pass.
pub struct TrackerCx<'a> {
    /// OS access.
    pub ops: &'a dyn ImeOps,
    /// Engine state; trackers are its only writers during a pass.
    pub state: &'a mut DetectionState,
    /// Indicator reader.
    pub pixel: &'a mut PixelVerifier,
    /// Per-window state memory.
    pub cache: &'a WindowStateCache,
    /// This pass's OS query.
    pub resolved: &'a Resolved,
    /// Foreground window of the previous pass.
    pub previous_window: WindowId,
    /// Language of the last published snapshot.
    pub previous_language: Language,
    /// Foreground window differs from the previous pass.
    pub window_changed: bool,
    /// Language differs from the last published snapshot.
    pub language_changed: bool,
    /// Pass time.
    pub now: Instant,
    /// Periodic pixel re-verification; `None` disables it.
    pub pixel_interval: Option<Duration>,
}

impl TrackerCx<'_> {
    /// Window or language changed since the last pass.
    pub fn transition(&self) -> bool {
        self.window_changed || self.language_changed
    }

    fn pixel_due(&self) -> bool {
        let Some(interval) = self.pixel_interval else {
            return false;
        };
        self.state
            .last_pixel_verification
            .is_none_or(|at| self.now.saturating_duration_since(at) >= interval)
    }

    /// Shared pixel step. Returns true when the pixel verdict, now stored in
    /// `tracked`, decides the result.
    fn pixel_phase(&mut self, kind: TrackerKind) -> bool {
        let transition = self.transition();
        if transition {
            *self.state.pixel_flag(kind) = false;
        }
        if transition || self.pixel_due() {
            let language = self.resolved.info.language;
            match self.pixel.detect(language, self.now) {
                Some(on) => {
                    debug!(%language, on, transition, "pixel_verification");
                    self.state.tracked = on;
                    *self.state.pixel_flag(kind) = true;
                    self.state.last_pixel_verification = Some(self.now);
                    if kind == TrackerKind::Chinese {
                        self.state.use_tracked_chinese = false;
                    }
                }
                None => *self.state.pixel_flag(kind) = false,
            }
        }
        *self.state.pixel_flag(kind)
    }

    fn with_tracked(&self) -> LanguageInfo {
        LanguageInfo::new(self.resolved.info.language, self.state.tracked)
    }
}

/// One language's reconciliation strategy.
pub trait LanguageTracker {
    /// Decide the published state for this pass.
    fn evaluate(&mut self, cx: &mut TrackerCx<'_>) -> LanguageInfo;
}

/// Japanese: pixel verdict, then toggle-key tracking, then the OS.
pub struct JapaneseTracker;

impl LanguageTracker for JapaneseTracker {
    fn evaluate(&mut self, cx: &mut TrackerCx<'_>) -> LanguageInfo {
        if cx.pixel_phase(TrackerKind::Japanese) || cx.state.use_tracked_japanese {
            return cx.with_tracked();
        }
        if cx.resolved.reliable {
            cx.state.tracked = cx.resolved.info.is_on;
        }
        cx.resolved.info
    }
}

/// Chinese: pixel verdict, then toggle-gesture tracking, then the OS.
pub struct ChineseTracker;

impl LanguageTracker for ChineseTracker {
    fn evaluate(&mut self, cx: &mut TrackerCx<'_>) -> LanguageInfo {
        if cx.pixel_phase(TrackerKind::Chinese) || cx.state.use_tracked_chinese {
            return cx.with_tracked();
        }
        cx.resolved.info
    }
}

/// Korean: pixel verdict, then the Hangul-mode query chain, then the
/// per-window cache.
pub struct KoreanTracker;

impl LanguageTracker for KoreanTracker {
    fn evaluate(&mut self, cx: &mut TrackerCx<'_>) -> LanguageInfo {
        if cx.pixel_phase(TrackerKind::Korean) {
            return cx.with_tracked();
        }
        if let Some(hangul) = query::korean_mode(cx.ops, cx.resolved.window) {
            cx.state.tracked = hangul;
            return cx.with_tracked();
        }
        if cx.transition() {
            if !cx.previous_window.is_null() && cx.previous_language == Language::Korean {
                trace!(window = %cx.previous_window, state = cx.state.tracked, "korean_state_saved");
                cx.cache.set(cx.previous_window, cx.state.tracked);
            }
            cx.state.tracked = cx.cache.try_get(cx.resolved.window).unwrap_or(false);
            debug!(window = %cx.resolved.window, state = cx.state.tracked, "korean_state_restored");
        }
        cx.with_tracked()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use win_ime::{MockImeOps, Rect};

    use super::*;
    use crate::{CacheConfig, EngineConfig, query::resolve};

    const FG: WindowId = WindowId(0x10);

    struct Fixture {
        ops: MockImeOps,
        state: DetectionState,
        pixel: PixelVerifier,
        cache: WindowStateCache,
    }

    impl Fixture {
        fn new(layout: u32) -> Self {
            let ops = MockImeOps::new();
            ops.set_foreground(FG, 5, layout);
            ops.update(|s| s.current_thread = 1);
            let pixel = PixelVerifier::new(Arc::new(ops.clone()), vec!["Input indicator".into()]);
            let cache = WindowStateCache::new(Arc::new(ops.clone()), &CacheConfig::default());
            Self {
                ops,
                state: DetectionState::default(),
                pixel,
                cache,
            }
        }

        fn run(&mut self, previous_window: WindowId, previous_language: Language) -> LanguageInfo {
            let resolved = resolve(&self.ops, &EngineConfig::default(), None).expect("resolve");
            let language_changed = resolved.info.language != previous_language;
            let mut cx = TrackerCx {
                ops: &self.ops,
                state: &mut self.state,
                pixel: &mut self.pixel,
                cache: &self.cache,
                window_changed: resolved.window != previous_window,
                language_changed,
                resolved: &resolved,
                previous_window,
                previous_language,
                now: Instant::now(),
                pixel_interval: None,
            };
            let kind = TrackerKind::for_language(resolved.info.language).expect("tracked language");
            kind.evaluate(&mut cx)
        }

        /// Indicator whose ink share is `dark` percent.
        fn indicator(&self, dark: usize) {
            let px = (0..100)
                .flat_map(|i| if i < dark { [0, 0, 0, 255] } else { [255; 4] })
                .collect();
            self.ops
                .set_indicator(Some(Rect::new(0, 0, 10, 10)), Some(px));
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(TrackerKind::for_language(Language::Japanese), Some(TrackerKind::Japanese));
        assert_eq!(TrackerKind::for_language(Language::Korean), Some(TrackerKind::Korean));
        assert_eq!(
            TrackerKind::for_language(Language::ChineseTraditional),
            Some(TrackerKind::Chinese)
        );
        assert_eq!(TrackerKind::for_language(Language::Thai), None);
    }

    #[test]
    fn japanese_pixel_wins_on_transition() {
        let mut f = Fixture::new(0x0411_0411);
        f.ops.update(|s| s.open_message = Some(false));
        f.indicator(10);
        let info = f.run(WindowId::NULL, Language::English);
        assert_eq!(info, LanguageInfo::new(Language::Japanese, true));
        assert!(f.state.use_pixel.japanese);
        assert!(f.state.tracked);

        // Pixel flag persists without a transition.
        let info = f.run(FG, Language::Japanese);
        assert!(info.is_on);
    }

    #[test]
    fn japanese_reliable_os_seeds_tracked() {
        let mut f = Fixture::new(0x0411_0411);
        f.ops.update(|s| s.open_message = Some(true));
        let info = f.run(FG, Language::Japanese);
        assert_eq!(info, LanguageInfo::new(Language::Japanese, true));
        assert!(f.state.tracked);
    }

    #[test]
    fn japanese_toggle_tracking_beats_os() {
        let mut f = Fixture::new(0x0411_0411);
        f.ops.update(|s| s.open_message = Some(false));
        f.state.use_tracked_japanese = true;
        f.state.tracked = true;
        let info = f.run(FG, Language::Japanese);
        assert!(info.is_on);
    }

    #[test]
    fn chinese_pixel_clears_gesture_tracking() {
        let mut f = Fixture::new(0x0804_0804);
        f.state.use_tracked_chinese = true;
        f.state.tracked = false;
        f.indicator(2);
        let info = f.run(WindowId::NULL, Language::English);
        assert_eq!(info, LanguageInfo::new(Language::ChineseSimplified, true));
        assert!(!f.state.use_tracked_chinese);
    }

    #[test]
    fn chinese_gesture_tracking_without_pixels() {
        let mut f = Fixture::new(0x0804_0804);
        f.ops.update(|s| s.open_message = Some(true));
        f.state.use_tracked_chinese = true;
        f.state.tracked = false;
        let info = f.run(FG, Language::ChineseSimplified);
        assert!(!info.is_on);

        f.state.use_tracked_chinese = false;
        let info = f.run(FG, Language::ChineseSimplified);
        assert!(info.is_on);
    }

    #[test]
    fn korean_all_queries_fail_defaults_off() {
        let mut f = Fixture::new(0x0412_0412);
        f.state.tracked = true;
        let info = f.run(WindowId::NULL, Language::English);
        assert_eq!(info, LanguageInfo::new(Language::Korean, false));
    }

    #[test]
    fn korean_cache_round_trip_between_windows() {
        let mut f = Fixture::new(0x0412_0412);
        let other = WindowId(0x20);
        f.ops.update(|s| {
            s.live.insert(other);
        });
        // Leaving `other` (Korean, Hangul on) for FG.
        f.state.tracked = true;
        let info = f.run(other, Language::Korean);
        assert!(!info.is_on);
        assert_eq!(f.cache.try_get(other), Some(true));

        // Back to `other`.
        f.ops.set_foreground(other, 6, 0x0412_0412);
        let info = f.run(FG, Language::Korean);
        assert!(info.is_on);
        assert_eq!(f.cache.try_get(FG), Some(false));
    }

    #[test]
    fn korean_query_chain_sets_tracked() {
        let mut f = Fixture::new(0x0412_0412);
        f.ops.update(|s| s.conversion_context = Some(1));
        let info = f.run(WindowId::NULL, Language::English);
        assert!(info.is_on);
        assert!(f.state.tracked);
    }

    #[test]
    fn periodic_pixel_check_only_when_due() {
        let mut f = Fixture::new(0x0411_0411);
        f.indicator(10);
        let resolved = resolve(&f.ops, &EngineConfig::default(), None).expect("resolve");
        let t0 = Instant::now();
        f.state.last_pixel_verification = Some(t0);
        let mut cx = TrackerCx {
            ops: &f.ops,
            state: &mut f.state,
            pixel: &mut f.pixel,
            cache: &f.cache,
            resolved: &resolved,
            previous_window: FG,
            previous_language: Language::Japanese,
            window_changed: false,
            language_changed: false,
            now: t0 + Duration::from_secs(1),
            pixel_interval: Some(Duration::from_secs(5)),
        };
        assert!(!cx.pixel_phase(TrackerKind::Japanese));
        cx.now = t0 + Duration::from_secs(5);
        assert!(cx.pixel_phase(TrackerKind::Japanese));
        assert_eq!(cx.state.last_pixel_verification, Some(t0 + Duration::from_secs(5)));
    }
}
