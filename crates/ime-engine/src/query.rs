//! OS query chains.
//!
//! No single Windows API reports the IME state of another process reliably,
//! so each question is answered by a chain of probes where the first probe
//! that can tell wins.

use tracing::{debug, trace};
use win_ime::{Compartment, ImeOps, WindowId};

use crate::{EngineConfig, Error, Language, LanguageInfo, Result, classify};

/// `IME_CMODE_NATIVE`: Hangul (Korean) or native-script input.
const IME_CMODE_NATIVE: u32 = 0x0001;
/// Largest conversion mode a Korean IME reports from a trustworthy context.
const KOREAN_MODE_MAX: u32 = 0x0003;

/// Result of one foreground query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Foreground window.
    pub window: WindowId,
    /// Window with keyboard focus inside the foreground thread, or the
    /// foreground window itself.
    pub focus_window: WindowId,
    /// Thread whose keyboard layout was read.
    pub thread: u32,
    /// Raw keyboard layout.
    pub layout: u32,
    /// Foreground process name.
    pub process: Option<String>,
    /// Foreground process is a terminal-class host.
    pub is_terminal: bool,
    /// Language and open status as reported by the OS.
    pub info: LanguageInfo,
    /// Some probe could actually tell the open status.
    pub reliable: bool,
}

impl Resolved {
    /// Nothing has the foreground.
    fn no_foreground() -> Self {
        Self {
            window: WindowId::NULL,
            focus_window: WindowId::NULL,
            thread: 0,
            layout: 0,
            process: None,
            is_terminal: false,
            info: LanguageInfo::new(Language::English, false),
            reliable: false,
        }
    }
}

/// Focus window and its thread for the foreground window `fg`.
///
/// When the foreground thread reports a distinct focus window, that window's
/// thread owns the active keyboard layout.
pub fn focus_target(ops: &dyn ImeOps, fg: WindowId) -> (WindowId, u32) {
    let thread = ops.window_thread(fg);
    match ops.focus_window(thread) {
        Some(focus) if focus != fg => (focus, ops.window_thread(focus)),
        _ => (fg, thread),
    }
}

/// Language of the layout active for `fg`'s focus thread.
pub fn focused_language(ops: &dyn ImeOps, fg: WindowId) -> Language {
    let (_, thread) = focus_target(ops, fg);
    classify(ops.keyboard_layout(thread))
}

/// True if the process owning `w` is a terminal-class host.
pub fn is_terminal(ops: &dyn ImeOps, cfg: &EngineConfig, w: WindowId) -> bool {
    ops.process_name(w).is_some_and(|p| cfg.is_terminal(&p))
}

/// Open status of the IME serving `fg`, or `None` when nothing could tell.
pub fn open_status(ops: &dyn ImeOps, fg: WindowId, focus: WindowId) -> Option<bool> {
    if let Some(v) = ops.open_status_message(fg) {
        trace!(v, "open_status_via_message");
        return Some(v);
    }
    if let Some(v) = ops.open_status_context(fg) {
        trace!(v, "open_status_via_foreground_context");
        return Some(v);
    }
    if !focus.is_null()
        && focus != fg
        && let Some(v) = ops.open_status_context(focus)
    {
        trace!(v, "open_status_via_focus_context");
        return Some(v);
    }
    if ops.candidate_window_visible(fg) {
        trace!("open_status_via_candidate_window");
        return Some(true);
    }
    None
}

/// Query the foreground window, its layout and its IME open status.
///
/// For terminal hosts with a tracked language, the tracked language replaces
/// the classified one. English never reports an open IME.
pub fn resolve(
    ops: &dyn ImeOps,
    cfg: &EngineConfig,
    terminal_language: Option<Language>,
) -> Result<Resolved> {
    let window = ops.foreground_window();
    if window.is_null() {
        return Ok(Resolved::no_foreground());
    }
    if ops.window_thread(window) == 0 {
        return Err(Error::Msg(format!("foreground window {window} has no thread")));
    }
    let (focus_window, thread) = focus_target(ops, window);
    let layout = ops.keyboard_layout(thread);
    let status = open_status(ops, window, focus_window);
    let process = ops.process_name(window);
    let is_terminal = process.as_deref().is_some_and(|p| cfg.is_terminal(p));

    let mut language = classify(layout);
    if is_terminal && let Some(tracked) = terminal_language {
        language = tracked;
    }
    let is_on = language != Language::English && status.unwrap_or(false);
    Ok(Resolved {
        window,
        focus_window,
        thread,
        layout,
        process,
        is_terminal,
        info: LanguageInfo::new(language, is_on),
        reliable: status.is_some(),
    })
}

/// Hangul bit of a conversion mode.
fn hangul_from_mode(mode: u32) -> bool {
    mode & IME_CMODE_NATIVE != 0
}

/// Conversion modes a Korean IME reports from a live context.
fn korean_mode_valid(mode: u32) -> bool {
    (1..=KOREAN_MODE_MAX).contains(&mode)
}

/// Hangul (true) or English (false) mode of a Korean IME serving `fg`.
pub fn korean_mode(ops: &dyn ImeOps, fg: WindowId) -> Option<bool> {
    if let Some(mode) = ops.conversion_mode_context(fg).filter(|m| korean_mode_valid(*m)) {
        debug!(mode, "korean_mode_via_context");
        return Some(hangul_from_mode(mode));
    }
    if let Some(mode) = ops.conversion_mode_message(fg).filter(|m| korean_mode_valid(*m)) {
        debug!(mode, "korean_mode_via_message");
        return Some(hangul_from_mode(mode));
    }

    let thread = ops.window_thread(fg);
    if thread != 0 && thread != ops.current_thread() {
        let probe = ops.conversion_mode_attached(thread, fg);
        if let Some(mode) = probe.conversion.filter(|m| *m != 0) {
            debug!(mode, "korean_mode_via_attached_context");
            return Some(hangul_from_mode(mode));
        }
        if let Some(key) = probe.hangul_key.filter(|k| *k != 0) {
            debug!(key, "korean_mode_via_key_state");
            return Some(key & 0x01 != 0);
        }
    }

    for c in Compartment::ALL {
        if let Some(v) = ops.tsf_compartment(c).filter(|v| *v != 0) {
            debug!(compartment = ?c, value = v, "korean_mode_via_tsf");
            return Some(v & IME_CMODE_NATIVE as i32 != 0);
        }
    }

    if ops.composition_length(fg).is_some_and(|n| n > 0) {
        debug!("korean_mode_via_composition");
        return Some(true);
    }
    None
}
