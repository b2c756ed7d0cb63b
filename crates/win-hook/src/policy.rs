use tracing::{debug, trace};
use win_keycode::{Modifier, Vk};

use crate::{ChineseToggle, EventKind, HookSignal, KeyEvent, KeyState};

/// A Shift tap longer than this is treated as a held modifier, not a toggle.
pub const ALONE_SHIFT_WINDOW_MS: u32 = 500;

/// Turns raw key transitions into semantic [`HookSignal`]s.
///
/// The only state carried across events is the "Shift pressed alone" tracker:
/// Shift going down arms it, any non-modifier key-down disarms it, and Shift
/// going up within [`ALONE_SHIFT_WINDOW_MS`] of the initial press fires a
/// [`ChineseToggle::Shift`].
#[derive(Debug, Clone)]
pub struct Interpreter {
    /// Shift is down and no non-modifier key has been pressed since.
    shift_alone: bool,
    /// Shift is physically down; used to ignore auto-repeat key-downs.
    shift_held: bool,
    /// Hook timestamp of the initial Shift press.
    shift_down_at: u32,
    /// Maximum press duration for an alone-Shift tap.
    alone_window_ms: u32,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter with the default alone-Shift window.
    pub fn new() -> Self {
        Self::with_alone_window(ALONE_SHIFT_WINDOW_MS)
    }

    /// Interpreter with a custom alone-Shift window.
    pub fn with_alone_window(alone_window_ms: u32) -> Self {
        Self {
            shift_alone: false,
            shift_held: false,
            shift_down_at: 0,
            alone_window_ms,
        }
    }

    /// Interpret one key event. `keys` answers "is this key held right now".
    pub fn on_event(&mut self, ev: KeyEvent, keys: &dyn KeyState) -> Vec<HookSignal> {
        let mut out = Vec::new();
        trace!(vk = %ev.vk, kind = ?ev.kind, time = ev.time_ms, "hook_key");

        if ev.vk.is_shift() {
            self.on_shift(ev, &mut out);
        } else if ev.is_down() && self.shift_alone && Modifier::try_from(ev.vk).is_err() {
            // Shift became part of a chord.
            self.shift_alone = false;
        }

        if ev.kind != EventKind::KeyDown {
            return out;
        }

        if ev.vk.is_ime_toggle() {
            debug!(vk = %ev.vk, "ime_key");
            out.push(HookSignal::ImeKey(ev.vk));
        }

        if ev.vk == Vk::SPACE {
            let win = held(keys, Modifier::Win);
            if win {
                debug!("language_switch_chord");
                out.push(HookSignal::LanguageSwitch);
            }
            if !win && held(keys, Modifier::Control) {
                debug!("ctrl_space_chord");
                out.push(HookSignal::ChineseToggle(ChineseToggle::CtrlSpace));
            }
        }
        out
    }

    /// Track the alone-Shift gesture across press and release.
    fn on_shift(&mut self, ev: KeyEvent, out: &mut Vec<HookSignal>) {
        match ev.kind {
            EventKind::KeyDown => {
                if !self.shift_held {
                    self.shift_held = true;
                    self.shift_alone = true;
                    self.shift_down_at = ev.time_ms;
                }
            }
            EventKind::KeyUp => {
                let elapsed = ev.time_ms.wrapping_sub(self.shift_down_at);
                if self.shift_alone && elapsed < self.alone_window_ms {
                    debug!(elapsed_ms = elapsed, "alone_shift");
                    out.push(HookSignal::ChineseToggle(ChineseToggle::Shift));
                }
                self.shift_alone = false;
                self.shift_held = false;
            }
        }
    }
}

/// True if either side of `m` is currently held.
fn held(keys: &dyn KeyState, m: Modifier) -> bool {
    m.keys().iter().any(|k| keys.is_down(*k))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[derive(Default)]
    struct Held(HashSet<Vk>);

    impl Held {
        fn with(keys: &[Vk]) -> Self {
            Self(keys.iter().copied().collect())
        }
    }

    impl KeyState for Held {
        fn is_down(&self, vk: Vk) -> bool {
            self.0.contains(&vk)
        }
    }

    fn feed(it: &mut Interpreter, keys: &Held, evs: &[KeyEvent]) -> Vec<HookSignal> {
        evs.iter().flat_map(|e| it.on_event(*e, keys)).collect()
    }

    const SHIFT_TAP: HookSignal = HookSignal::ChineseToggle(ChineseToggle::Shift);

    #[test]
    fn alone_shift_emits_once() {
        let mut it = Interpreter::new();
        let out = feed(
            &mut it,
            &Held::default(),
            &[KeyEvent::down(Vk::LSHIFT, 100), KeyEvent::up(Vk::LSHIFT, 180)],
        );
        assert_eq!(out, vec![SHIFT_TAP]);
    }

    #[test]
    fn shift_with_letter_is_suppressed() {
        let mut it = Interpreter::new();
        let out = feed(
            &mut it,
            &Held::default(),
            &[
                KeyEvent::down(Vk::LSHIFT, 100),
                KeyEvent::down(Vk(0x41), 120),
                KeyEvent::up(Vk(0x41), 140),
                KeyEvent::up(Vk::LSHIFT, 160),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn shift_with_ctrl_still_counts_as_alone() {
        let mut it = Interpreter::new();
        let out = feed(
            &mut it,
            &Held::default(),
            &[
                KeyEvent::down(Vk::RSHIFT, 0),
                KeyEvent::down(Vk::LCONTROL, 10),
                KeyEvent::up(Vk::RSHIFT, 50),
            ],
        );
        assert_eq!(out, vec![SHIFT_TAP]);
    }

    #[test]
    fn long_shift_press_is_ignored() {
        let mut it = Interpreter::new();
        let out = feed(
            &mut it,
            &Held::default(),
            &[
                KeyEvent::down(Vk::LSHIFT, 1000),
                // OS auto-repeat must not restart the timer.
                KeyEvent::down(Vk::LSHIFT, 1300),
                KeyEvent::down(Vk::LSHIFT, 1450),
                KeyEvent::up(Vk::LSHIFT, 1600),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn shift_timer_survives_tick_wraparound() {
        let mut it = Interpreter::new();
        let out = feed(
            &mut it,
            &Held::default(),
            &[
                KeyEvent::down(Vk::LSHIFT, u32::MAX - 50),
                KeyEvent::up(Vk::LSHIFT, 40),
            ],
        );
        assert_eq!(out, vec![SHIFT_TAP]);
    }

    #[test]
    fn toggle_keys_emit_on_down_only() {
        let mut it = Interpreter::new();
        let keys = Held::default();
        assert_eq!(
            it.on_event(KeyEvent::down(Vk::KANJI, 0), &keys),
            vec![HookSignal::ImeKey(Vk::KANJI)]
        );
        assert!(it.on_event(KeyEvent::up(Vk::KANJI, 5), &keys).is_empty());
        assert_eq!(
            it.on_event(KeyEvent::down(Vk::OEM_ENLW, 10), &keys),
            vec![HookSignal::ImeKey(Vk::OEM_ENLW)]
        );
    }

    #[test]
    fn win_space_is_language_switch_only() {
        let mut it = Interpreter::new();
        let keys = Held::with(&[Vk::LWIN, Vk::LCONTROL]);
        assert_eq!(
            it.on_event(KeyEvent::down(Vk::SPACE, 0), &keys),
            vec![HookSignal::LanguageSwitch]
        );
    }

    #[test]
    fn ctrl_space_toggles_chinese() {
        let mut it = Interpreter::new();
        let keys = Held::with(&[Vk::RCONTROL]);
        assert_eq!(
            it.on_event(KeyEvent::down(Vk::SPACE, 0), &keys),
            vec![HookSignal::ChineseToggle(ChineseToggle::CtrlSpace)]
        );
    }

    #[test]
    fn bare_space_is_silent() {
        let mut it = Interpreter::new();
        assert!(
            it.on_event(KeyEvent::down(Vk::SPACE, 0), &Held::default())
                .is_empty()
        );
    }

    #[test]
    fn shift_space_suppresses_alone_shift() {
        let mut it = Interpreter::new();
        let out = feed(
            &mut it,
            &Held::with(&[Vk::LSHIFT]),
            &[
                KeyEvent::down(Vk::LSHIFT, 0),
                KeyEvent::down(Vk::SPACE, 20),
                KeyEvent::up(Vk::LSHIFT, 60),
            ],
        );
        assert!(out.is_empty());
    }

    proptest! {
        #[test]
        fn at_most_one_shift_toggle_per_press(
            hold in 0u32..2000,
            start in any::<u32>(),
        ) {
            let mut it = Interpreter::new();
            let out = feed(
                &mut it,
                &Held::default(),
                &[
                    KeyEvent::down(Vk::LSHIFT, start),
                    KeyEvent::up(Vk::LSHIFT, start.wrapping_add(hold)),
                ],
            );
            let expected = usize::from(hold < ALONE_SHIFT_WINDOW_MS);
            prop_assert_eq!(out.len(), expected);
        }

        #[test]
        fn letters_never_emit(code in 0x41u16..=0x5A, t in any::<u32>()) {
            let mut it = Interpreter::new();
            let keys = Held::default();
            prop_assert!(it.on_event(KeyEvent::down(Vk(code), t), &keys).is_empty());
            prop_assert!(it.on_event(KeyEvent::up(Vk(code), t), &keys).is_empty());
        }
    }
}
