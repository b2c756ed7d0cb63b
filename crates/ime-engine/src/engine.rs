//! One reconciliation pass and hook signal handling.
//!
//! `Engine` owns the detection state and is driven by the monitor loop; it
//! never spawns or sleeps, so tests can step it directly with chosen
//! instants.

use std::{sync::Arc, time::Instant};

use tracing::{debug, trace};
use win_hook::HookSignal;
use win_ime::{ImeOps, WindowId, WindowProbe};
use win_keycode::Vk;

use crate::{
    EngineConfig, Language, LanguageInfo, PixelVerifier, Result, WindowStateCache, classify,
    query,
    state::DetectionState,
    tracker::{TrackerCx, TrackerKind},
};

/// What the loop must do after a signal was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEffect {
    /// Nothing changed.
    None,
    /// Run a forced pass.
    Recheck,
    /// Re-read the layout of this window after the configured delay, then
    /// run a forced pass.
    RereadLayout(WindowId),
}

/// Detection state plus everything needed to advance it.
pub struct Engine {
    /// OS access.
    ops: Arc<dyn ImeOps>,
    /// Runtime configuration.
    config: EngineConfig,
    /// Mutable detection state.
    state: DetectionState,
    /// Indicator reader.
    pixel: PixelVerifier,
    /// Per-window Korean state memory.
    cache: WindowStateCache,
}

impl Engine {
    /// Engine with initial state `{English, off}`.
    pub fn new(ops: Arc<dyn ImeOps>, config: EngineConfig) -> Self {
        let pixel = PixelVerifier::new(Arc::clone(&ops), config.indicator_names.clone());
        let probe: Arc<dyn WindowProbe> = Arc::clone(&ops) as _;
        let cache = WindowStateCache::new(probe, &config.cache);
        Self {
            ops,
            config,
            state: DetectionState::default(),
            pixel,
            cache,
        }
    }

    /// Last published snapshot.
    pub fn current(&self) -> LanguageInfo {
        self.state.last_published
    }

    /// Detection state, for inspection.
    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-window state cache.
    pub fn window_cache(&self) -> &WindowStateCache {
        &self.cache
    }

    /// Change the periodic pixel verification period; 0 disables it.
    pub fn set_pixel_verification_interval(&mut self, ms: u64) {
        self.config.pixel_verification_interval_ms = ms;
    }

    /// Change the tick period recorded in the configuration.
    pub fn set_polling_interval(&mut self, ms: u64) {
        self.config.polling_interval_ms = ms.max(1);
    }

    /// Forget per-window state and cached indicator reads.
    pub fn clear_window_cache(&mut self) {
        self.cache.clear();
        self.pixel.clear_cache();
    }

    /// Cursor position, if readable.
    pub fn cursor_pos(&self) -> Option<(i32, i32)> {
        self.ops.cursor_pos()
    }

    /// Run one pass. Returns the snapshot when it was published.
    pub fn check(&mut self, force: bool, now: Instant) -> Result<Option<LanguageInfo>> {
        let resolved = query::resolve(&*self.ops, &self.config, self.state.terminal_language)?;
        let window_changed = resolved.window != self.state.last_foreground;
        if window_changed {
            self.state.use_tracked_japanese = false;
            self.state.use_tracked_chinese = false;
        }
        let previous = self.state.last_published;
        let previous_window = self.state.last_foreground;
        let language_changed = resolved.info.language != previous.language;
        trace!(
            window = %resolved.window,
            layout = resolved.layout,
            info = %resolved.info,
            reliable = resolved.reliable,
            window_changed,
            language_changed,
            "ime_pass"
        );

        let mut info = match TrackerKind::for_language(resolved.info.language) {
            Some(kind) => {
                let mut cx = TrackerCx {
                    ops: &*self.ops,
                    state: &mut self.state,
                    pixel: &mut self.pixel,
                    cache: &self.cache,
                    resolved: &resolved,
                    previous_window,
                    previous_language: previous.language,
                    window_changed,
                    language_changed,
                    now,
                    pixel_interval: self.config.pixel_verification_interval(),
                };
                kind.evaluate(&mut cx)
            }
            None => self.untracked(&resolved, window_changed, language_changed),
        };
        if info.language == Language::English {
            info.is_on = false;
        }

        self.state.last_foreground = resolved.window;
        if info != previous || force {
            debug!(%info, force, "ime_state_published");
            self.state.last_published = info;
            return Ok(Some(info));
        }
        Ok(None)
    }

    /// Languages without a dedicated tracker.
    fn untracked(
        &mut self,
        resolved: &query::Resolved,
        window_changed: bool,
        language_changed: bool,
    ) -> LanguageInfo {
        let mut info = resolved.info;
        let st = &mut self.state;
        if (window_changed || language_changed) && !resolved.is_terminal {
            if resolved.reliable {
                st.tracked = info.is_on;
            } else if language_changed {
                st.tracked = true;
            }
            st.terminal_language = Some(info.language);
        } else if window_changed && resolved.is_terminal && st.terminal_language.is_none() {
            st.terminal_language = Some(info.language);
        }

        if info.language != Language::English && (resolved.is_terminal || !resolved.reliable) {
            info.is_on = st.tracked;
        } else if resolved.reliable {
            st.tracked = info.is_on;
        }
        info
    }

    fn is_terminal(&self, w: WindowId) -> bool {
        query::is_terminal(&*self.ops, &self.config, w)
    }

    /// Apply one hook signal to the detection state.
    pub fn apply_signal(&mut self, signal: HookSignal) -> SignalEffect {
        match signal {
            HookSignal::ImeKey(Vk::KANJI) => {
                let on = self.state.toggle();
                debug!(on, "kanji_toggle");
                SignalEffect::Recheck
            }
            HookSignal::ImeKey(Vk::HANGUL) => self.on_hangul(),
            HookSignal::ImeKey(Vk::OEM_AUTO) => self.on_japanese_width(false),
            HookSignal::ImeKey(Vk::OEM_ENLW) => self.on_japanese_width(true),
            HookSignal::ImeKey(vk) => {
                trace!(%vk, "ime_key_ignored");
                SignalEffect::None
            }
            HookSignal::LanguageSwitch => {
                let fg = self.ops.foreground_window();
                if self.is_terminal(fg) {
                    debug!(window = %fg, "terminal_language_pending");
                    self.state.language_pending = true;
                    SignalEffect::None
                } else {
                    SignalEffect::RereadLayout(fg)
                }
            }
            HookSignal::ChineseToggle(kind) => {
                let fg = self.ops.foreground_window();
                if !query::focused_language(&*self.ops, fg).is_chinese() {
                    return SignalEffect::None;
                }
                let on = self.state.toggle();
                self.state.use_tracked_chinese = true;
                debug!(?kind, on, "chinese_toggle");
                SignalEffect::Recheck
            }
        }
    }

    fn on_hangul(&mut self) -> SignalEffect {
        let fg = self.ops.foreground_window();
        let terminal = self.is_terminal(fg);
        let by_layout = query::focused_language(&*self.ops, fg) == Language::Korean;
        let by_tracking = terminal && self.state.terminal_language == Some(Language::Korean);
        let pending = terminal && self.state.language_pending;
        if !(by_layout || by_tracking || pending) {
            trace!(window = %fg, "hangul_key_ignored");
            return SignalEffect::None;
        }
        self.state.terminal_language = Some(Language::Korean);
        self.state.language_pending = false;
        let on = self.state.toggle();
        debug!(on, by_layout, by_tracking, pending, "hangul_toggle");
        SignalEffect::Recheck
    }

    /// `VK_OEM_AUTO` (off) and `VK_OEM_ENLW` (on) are sent by Japanese IMEs
    /// with a definite target state.
    fn on_japanese_width(&mut self, on: bool) -> SignalEffect {
        self.state.tracked = on;
        self.state.terminal_language = Some(Language::Japanese);
        self.state.language_pending = false;
        self.state.use_tracked_japanese = true;
        debug!(on, "japanese_mode_key");
        SignalEffect::Recheck
    }

    /// Delayed half of a language switch: record the new layout's language.
    pub fn reread_layout(&mut self, window: WindowId) {
        let thread = self.ops.window_thread(window);
        let language = classify(self.ops.keyboard_layout(thread));
        self.state.terminal_language = Some(language);
        if language == Language::Korean {
            self.state.tracked = false;
        }
        debug!(window = %window, %language, "language_switch_reread");
    }
}
