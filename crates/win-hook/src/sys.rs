//! `WH_KEYBOARD_LL` integration.
//!
//! Low-level keyboard hooks are delivered to the thread that installed them,
//! and only while that thread pumps messages. The hook thread therefore owns
//! both the hook handle and a `GetMessageW` loop; cancelling the
//! [`HookGate`] posts `WM_QUIT` to break it. The callback never blocks: signals go out through
//! `try_send`, and every path ends in `CallNextHookEx`.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use crossbeam_channel::Sender;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, trace, warn};
use win_keycode::Vk;
use windows::Win32::{
    Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
    System::Threading::GetCurrentThreadId,
    UI::{
        Input::KeyboardAndMouse::GetAsyncKeyState,
        WindowsAndMessaging::{
            CallNextHookEx, DispatchMessageW, GetMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT,
            MSG, PostThreadMessageW, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx,
            WH_KEYBOARD_LL, WM_QUIT,
        },
    },
};

use crate::{Error, HookGate, Interpreter, KeyEvent, KeyState, SignalSink};

/// Per-hook state reachable from the `extern "system"` callback.
struct HookState {
    /// Gesture interpreter; only touched on the hook thread.
    interpreter: Interpreter,
    /// Where interpreted signals go.
    sink: SignalSink,
}

/// The callback has no user-data pointer, so its state lives in a static.
static HOOK_STATE: Lazy<Mutex<Option<HookState>>> = Lazy::new(|| Mutex::new(None));

/// Ask the hook thread `id` to leave its message loop.
pub(crate) fn post_quit(id: u32) {
    if let Err(e) = unsafe { PostThreadMessageW(id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
        warn!(error = %e, thread = id, "post_quit_failed");
    }
}

/// Key state read from `GetAsyncKeyState` at callback time.
struct AsyncKeyState;

impl KeyState for AsyncKeyState {
    fn is_down(&self, vk: Vk) -> bool {
        let state = unsafe { GetAsyncKeyState(i32::from(vk.code())) };
        (state as u16) & 0x8000 != 0
    }
}

/// Install the hook, report readiness, and pump messages until `WM_QUIT`.
pub fn run_hook_loop(
    sink: SignalSink,
    ready: Sender<crate::Result<()>>,
    gate: Arc<HookGate>,
) -> crate::Result<()> {
    *HOOK_STATE.lock() = Some(HookState {
        interpreter: Interpreter::new(),
        sink,
    });

    debug!("installing_keyboard_hook");
    let hook = match unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), HINSTANCE::default(), 0)
    } {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "set_windows_hook_failed");
            HOOK_STATE.lock().take();
            let _ = ready.send(Err(Error::HookInstall));
            return Err(Error::HookInstall);
        }
    };

    if !gate.register(unsafe { GetCurrentThreadId() }) {
        debug!("keyboard_hook_abandoned");
        unhook(hook);
        HOOK_STATE.lock().take();
        return Ok(());
    }
    let _ = ready.send(Ok(()));

    let mut msg = MSG::default();
    loop {
        let r = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
        if r.0 == -1 {
            warn!("get_message_failed");
            break;
        }
        if r.0 == 0 || msg.message == WM_QUIT {
            break;
        }
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    unhook(hook);
    HOOK_STATE.lock().take();
    debug!("keyboard_hook_loop_exit");
    Ok(())
}

fn unhook(hook: HHOOK) {
    if let Err(e) = unsafe { UnhookWindowsHookEx(hook) } {
        warn!(error = %e, "unhook_failed");
    }
}

unsafe extern "system" fn hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let r = catch_unwind(AssertUnwindSafe(|| {
            // SAFETY: for HC_ACTION, lparam points at a KBDLLHOOKSTRUCT.
            let data = unsafe { &*(lparam.0 as *const KBDLLHOOKSTRUCT) };
            handle_key(wparam.0 as u32, data);
        }));
        if r.is_err() {
            error!("keyboard_hook_panicked");
        }
    }
    unsafe { CallNextHookEx(HHOOK::default(), code, wparam, lparam) }
}

fn handle_key(msg: u32, data: &KBDLLHOOKSTRUCT) {
    let Some(ev) = KeyEvent::from_message(msg, data.vkCode, data.time) else {
        return;
    };
    let mut guard = HOOK_STATE.lock();
    let Some(state) = guard.as_mut() else { return };
    for sig in state.interpreter.on_event(ev, &AsyncKeyState) {
        match state.sink.try_send(sig) {
            Ok(()) => {}
            Err(TrySendError::Full(sig)) => trace!(?sig, "signal_queue_full"),
            Err(TrySendError::Closed(_)) => {
                trace!("signal_queue_closed");
                return;
            }
        }
    }
}
