//! End-to-end passes of the engine against scripted OS behavior.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use ime_engine::{Engine, EngineConfig, Language, LanguageInfo, classify};
use win_hook::{HookSignal, Vk};
use win_ime::{MockImeOps, Rect, WindowId};

const A: WindowId = WindowId(0xA0);
const B: WindowId = WindowId(0xB0);

fn engine(ops: &MockImeOps) -> Engine {
    Engine::new(Arc::new(ops.clone()), EngineConfig::default())
}

fn indicator(ops: &MockImeOps, dark_per_thousand: usize) {
    let px = (0..1000)
        .flat_map(|i| if i < dark_per_thousand { [0, 0, 0, 255] } else { [255; 4] })
        .collect();
    ops.set_indicator(Some(Rect::new(100, 100, 40, 25)), Some(px));
}

#[test]
fn japanese_layout_with_pixel_on_after_window_change() {
    assert_eq!(classify(0x0411_0411), Language::Japanese);
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0411_0411);
    ops.update(|s| s.open_message = Some(false));
    indicator(&ops, 76);
    let mut e = engine(&ops);
    let r = e.check(false, Instant::now()).expect("check");
    assert_eq!(r, Some(LanguageInfo::new(Language::Japanese, true)));
}

#[test]
fn japanese_pixel_off_below_threshold() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0411_0411);
    ops.update(|s| s.open_message = Some(true));
    indicator(&ops, 74);
    let mut e = engine(&ops);
    let r = e.check(false, Instant::now()).expect("check");
    assert_eq!(r, Some(LanguageInfo::new(Language::Japanese, false)));
}

#[test]
fn korean_with_every_query_failing_is_off() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0412_0412);
    let mut e = engine(&ops);
    let r = e.check(false, Instant::now()).expect("check");
    assert_eq!(r, Some(LanguageInfo::new(Language::Korean, false)));
}

#[test]
fn english_publishes_off_whatever_the_os_says() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0411_0411);
    ops.update(|s| s.open_message = Some(true));
    let mut e = engine(&ops);
    let now = Instant::now();
    assert!(e.check(false, now).expect("check").is_some());

    ops.set_foreground(B, 2, 0x0409_0409);
    ops.update(|s| {
        s.candidates.insert(B);
    });
    let r = e.check(false, now).expect("check");
    assert_eq!(r, Some(LanguageInfo::new(Language::English, false)));
}

#[test]
fn periodic_pixel_verification_corrects_drift() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0804_0804);
    indicator(&ops, 20);
    let mut e = engine(&ops);
    let t0 = Instant::now();
    assert_eq!(
        e.check(false, t0).expect("check"),
        Some(LanguageInfo::new(Language::ChineseSimplified, true))
    );

    // Glyph switches to 英; not re-read until the interval elapses.
    indicator(&ops, 90);
    assert_eq!(e.check(false, t0 + Duration::from_secs(1)).expect("check"), None);
    assert_eq!(
        e.check(false, t0 + Duration::from_secs(5)).expect("check"),
        Some(LanguageInfo::new(Language::ChineseSimplified, false))
    );
}

#[test]
fn disabled_pixel_interval_keeps_pixel_verdict() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0804_0804);
    indicator(&ops, 20);
    let mut e = engine(&ops);
    e.set_pixel_verification_interval(0);
    let t0 = Instant::now();
    assert!(e.check(false, t0).expect("check").is_some());
    indicator(&ops, 90);
    assert_eq!(e.check(false, t0 + Duration::from_secs(60)).expect("check"), None);
    assert!(e.state().use_pixel.chinese);
}

#[test]
fn korean_state_follows_windows() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0412_0412);
    ops.update(|s| {
        s.live.insert(B);
        s.current_thread = 99;
    });
    let mut e = engine(&ops);
    e.set_pixel_verification_interval(0);
    let now = Instant::now();
    e.check(false, now).expect("check");
    e.apply_signal(HookSignal::ImeKey(Vk::HANGUL));
    assert_eq!(
        e.check(true, now).expect("check"),
        Some(LanguageInfo::new(Language::Korean, true))
    );

    ops.set_foreground(B, 2, 0x0412_0412);
    assert_eq!(
        e.check(false, now).expect("check"),
        Some(LanguageInfo::new(Language::Korean, false))
    );
    assert_eq!(e.window_cache().count(), 1);

    ops.set_foreground(A, 1, 0x0412_0412);
    assert_eq!(
        e.check(false, now).expect("check"),
        Some(LanguageInfo::new(Language::Korean, true))
    );
}

#[test]
fn korean_api_answer_beats_cache() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0412_0412);
    ops.update(|s| s.conversion_message = Some(1));
    let mut e = engine(&ops);
    e.set_pixel_verification_interval(0);
    assert_eq!(
        e.check(false, Instant::now()).expect("check"),
        Some(LanguageInfo::new(Language::Korean, true))
    );
    assert_eq!(e.window_cache().count(), 0);
}

#[test]
fn terminal_reports_tracked_language() {
    let ops = MockImeOps::new();
    ops.set_foreground(A, 1, 0x0409_0409);
    ops.set_process(A, "powershell");
    let mut e = engine(&ops);
    e.set_pixel_verification_interval(0);
    let now = Instant::now();
    assert_eq!(e.check(false, now).expect("check"), None);
    assert_eq!(e.state().terminal_language, Some(Language::English));

    e.apply_signal(HookSignal::ImeKey(Vk::OEM_ENLW));
    assert_eq!(
        e.check(true, now).expect("check"),
        Some(LanguageInfo::new(Language::Japanese, true))
    );
}
