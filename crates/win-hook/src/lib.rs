//! win-hook: system-wide keyboard hook for IME state tracking.
//!
//! A single `WH_KEYBOARD_LL` hook runs on a dedicated thread with its own
//! message pump. Every key event in the session passes through the
//! [`Interpreter`], which turns raw key-downs and key-ups into a handful of
//! semantic [`HookSignal`]s:
//! - an IME toggle key was pressed (Hankaku/Zenkaku, Hangul, Eisu, ...)
//! - a language switch chord (Win+Space) was pressed
//! - a Chinese IME mode toggle (Shift tapped alone, or Ctrl+Space)
//!
//! Signals are pushed into a bounded channel with `try_send`; the hook never
//! blocks and never swallows keys, so the OS always sees `CallNextHookEx`.
//! Interpretation is pure and platform independent, which keeps it testable
//! off Windows.

use std::{sync::Arc, thread, time::Duration};

use parking_lot::Mutex;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};
pub use win_keycode::Vk;

mod error;
mod gate;
mod policy;
#[cfg(windows)]
mod sys;

pub use error::{Error, Result};
use gate::HookGate;
pub use policy::{ALONE_SHIFT_WINDOW_MS, Interpreter};

/// How long `start` waits for the hook thread to report installation.
const READY_TIMEOUT_MS: u64 = 2000;

/// `WM_KEYDOWN`
pub const WM_KEYDOWN: u32 = 0x0100;
/// `WM_KEYUP`
pub const WM_KEYUP: u32 = 0x0101;
/// `WM_SYSKEYDOWN`
pub const WM_SYSKEYDOWN: u32 = 0x0104;
/// `WM_SYSKEYUP`
pub const WM_SYSKEYUP: u32 = 0x0105;

/// Kind of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Key pressed (including OS auto-repeat).
    KeyDown,
    /// Key released.
    KeyUp,
}

/// A single key transition as reported by the low-level hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Virtual-key code.
    pub vk: Vk,
    /// Down or up.
    pub kind: EventKind,
    /// Hook timestamp in milliseconds; wraps around like `GetTickCount`.
    pub time_ms: u32,
}

impl KeyEvent {
    /// Create a key-down event.
    pub fn down(vk: Vk, time_ms: u32) -> Self {
        Self {
            vk,
            kind: EventKind::KeyDown,
            time_ms,
        }
    }

    /// Create a key-up event.
    pub fn up(vk: Vk, time_ms: u32) -> Self {
        Self {
            vk,
            kind: EventKind::KeyUp,
            time_ms,
        }
    }

    /// Build an event from a hook message id and `KBDLLHOOKSTRUCT` fields.
    ///
    /// Returns `None` for messages other than (sys)key down/up.
    pub fn from_message(msg: u32, vk: u32, time_ms: u32) -> Option<Self> {
        let kind = match msg {
            WM_KEYDOWN | WM_SYSKEYDOWN => EventKind::KeyDown,
            WM_KEYUP | WM_SYSKEYUP => EventKind::KeyUp,
            _ => return None,
        };
        Some(Self {
            vk: Vk::from(vk),
            kind,
            time_ms,
        })
    }

    /// True for key-down events.
    pub fn is_down(&self) -> bool {
        self.kind == EventKind::KeyDown
    }
}

/// Variant of Chinese IME toggle gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChineseToggle {
    /// Shift pressed and released on its own (中/英 switch).
    Shift,
    /// Ctrl+Space (IME on/off).
    CtrlSpace,
}

/// Semantic signal emitted by the hook interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSignal {
    /// One of [`Vk::IME_TOGGLES`] went down.
    ImeKey(Vk),
    /// Win+Space: the active input language is about to change.
    LanguageSwitch,
    /// A Chinese IME mode toggle gesture.
    ChineseToggle(ChineseToggle),
}

/// Instantaneous key state, read at the moment an event is interpreted.
pub trait KeyState {
    /// True if `vk` is physically held right now.
    fn is_down(&self, vk: Vk) -> bool;
}

/// Channel end the hook pushes signals into.
pub type SignalSink = Sender<HookSignal>;

/// Handle owning the hook thread.
///
/// `start` installs the hook and blocks until the thread reports readiness.
/// `stop` is idempotent and also runs on drop.
pub struct KeyboardHook {
    /// Join handle for the hook thread while running.
    thread: Mutex<Option<thread::JoinHandle<()>>>,
    /// Lifecycle handshake shared with the hook thread.
    gate: Arc<HookGate>,
    /// How long `start` waits for the thread to report readiness.
    ready_timeout: Duration,
}

impl Default for KeyboardHook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
fn quit_thread(id: u32) {
    sys::post_quit(id);
}

#[cfg(not(windows))]
fn quit_thread(_id: u32) {}

impl KeyboardHook {
    /// Create an idle hook handle.
    pub fn new() -> Self {
        Self::with_ready_timeout(Duration::from_millis(READY_TIMEOUT_MS))
    }

    /// Create an idle hook handle with a custom readiness timeout.
    pub fn with_ready_timeout(ready_timeout: Duration) -> Self {
        Self {
            thread: Mutex::new(None),
            gate: Arc::new(HookGate::new(quit_thread)),
            ready_timeout,
        }
    }

    /// True while the hook thread is alive.
    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Install the hook on a dedicated thread and route signals to `sink`.
    #[cfg(windows)]
    pub fn start(&self, sink: SignalSink) -> Result<()> {
        self.launch(move |ready, gate| {
            if let Err(e) = sys::run_hook_loop(sink, ready, gate) {
                warn!(error = %e, "hook_thread_exit_error");
            }
        })
    }

    /// Install the hook on a dedicated thread and route signals to `sink`.
    #[cfg(not(windows))]
    pub fn start(&self, sink: SignalSink) -> Result<()> {
        let _ = sink;
        warn!("keyboard_hook_unsupported_platform");
        Err(Error::Unsupported)
    }

    /// Run `body` on the hook thread and wait for it to report readiness.
    ///
    /// On timeout the gate is cancelled and the thread joined, so a hook
    /// installed after the deadline is removed before this returns.
    #[cfg_attr(not(windows), allow(dead_code))]
    fn launch<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce(crossbeam_channel::Sender<Result<()>>, Arc<HookGate>) + Send + 'static,
    {
        let mut guard = self.thread.lock();
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(Error::AlreadyRunning);
        }
        self.gate.reset();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let gate = Arc::clone(&self.gate);
        let handle = thread::Builder::new()
            .name("win-hook".into())
            .spawn(move || body(ready_tx, gate))
            .map_err(|e| Error::OsError(e.to_string()))?;
        match ready_rx.recv_timeout(self.ready_timeout) {
            Ok(Ok(())) => {
                debug!("keyboard_hook_started");
                *guard = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                warn!("keyboard_hook_ready_timeout");
                self.gate.cancel();
                if handle.join().is_err() {
                    warn!("hook_thread_panicked");
                }
                Err(Error::HookInstall)
            }
        }
    }

    /// Remove the hook and join its thread. Safe to call repeatedly.
    pub fn stop(&self) {
        let handle = self.thread.lock().take();
        let Some(handle) = handle else { return };
        self.gate.cancel();
        if handle.join().is_err() {
            warn!("hook_thread_panicked");
        }
        debug!("keyboard_hook_stopped");
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.stop();
    }
}
