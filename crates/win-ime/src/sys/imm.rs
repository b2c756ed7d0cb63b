use windows::Win32::{
    Foundation::{HWND, LPARAM, WPARAM},
    UI::{
        Input::{
            Ime::{
                GCS_COMPSTR, HIMC, IME_CONVERSION_MODE, ImmGetCompositionStringW, ImmGetContext,
                ImmGetConversionStatus, ImmGetDefaultIMEWnd, ImmGetOpenStatus, ImmReleaseContext,
            },
            KeyboardAndMouse::{AttachThreadInput, GetFocus, GetKeyboardState},
        },
        WindowsAndMessaging::{SMTO_ABORTIFHUNG, SendMessageTimeoutW},
    },
};
use tracing::trace;
use super::{MESSAGE_TIMEOUT_MS, hwnd, window::current_thread, window_id};
use crate::{AttachedProbe, WindowId};

/// `WM_IME_CONTROL`
const WM_IME_CONTROL: u32 = 0x0283;
/// `IMC_GETCONVERSIONMODE`
const IMC_GETCONVERSIONMODE: usize = 0x0001;
/// `IMC_GETOPENSTATUS`
const IMC_GETOPENSTATUS: usize = 0x0005;
/// Index of the Hangul key in a keyboard state array.
const VK_HANGUL: usize = 0x15;

/// Input context borrowed from a window, released on drop.
struct Context {
    /// Window the context belongs to.
    hwnd: HWND,
    /// The context itself.
    himc: HIMC,
}

impl Context {
    fn acquire(h: HWND) -> Option<Self> {
        if h.is_invalid() {
            return None;
        }
        let himc = unsafe { ImmGetContext(h) };
        if himc.is_invalid() {
            return None;
        }
        Some(Self { hwnd: h, himc })
    }

    fn open_status(&self) -> bool {
        unsafe { ImmGetOpenStatus(self.himc) }.as_bool()
    }

    fn conversion(&self) -> Option<u32> {
        let mut mode = IME_CONVERSION_MODE::default();
        unsafe { ImmGetConversionStatus(self.himc, Some(&mut mode as *mut _), None) }
            .as_bool()
            .then_some(mode.0)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let _ = unsafe { ImmReleaseContext(self.hwnd, self.himc) };
    }
}

/// Send `WM_IME_CONTROL` with `command` to the default IME window of `w`.
fn ime_control(w: WindowId, command: usize) -> Option<usize> {
    if w.is_null() {
        return None;
    }
    let ime = unsafe { ImmGetDefaultIMEWnd(hwnd(w)) };
    if ime.is_invalid() {
        return None;
    }
    let mut out = 0usize;
    let sent = unsafe {
        SendMessageTimeoutW(
            ime,
            WM_IME_CONTROL,
            WPARAM(command),
            LPARAM(0),
            SMTO_ABORTIFHUNG,
            MESSAGE_TIMEOUT_MS,
            Some(&mut out as *mut usize),
        )
    };
    if sent.0 == 0 {
        trace!(window = %w, command, "ime_control_timeout");
        return None;
    }
    Some(out)
}

pub(crate) fn open_status_message(w: WindowId) -> Option<bool> {
    ime_control(w, IMC_GETOPENSTATUS).map(|v| v != 0)
}

pub(crate) fn open_status_context(w: WindowId) -> Option<bool> {
    Context::acquire(hwnd(w)).map(|c| c.open_status())
}

pub(crate) fn conversion_mode_context(w: WindowId) -> Option<u32> {
    Context::acquire(hwnd(w))?.conversion()
}

pub(crate) fn conversion_mode_message(w: WindowId) -> Option<u32> {
    ime_control(w, IMC_GETCONVERSIONMODE).map(|v| v as u32)
}

pub(crate) fn composition_length(w: WindowId) -> Option<usize> {
    let ctx = Context::acquire(hwnd(w))?;
    let len = unsafe { ImmGetCompositionStringW(ctx.himc, GCS_COMPSTR, None, 0) };
    usize::try_from(len).ok()
}

/// Input state shared with another thread, detached on drop.
struct Attached {
    /// Calling thread.
    from: u32,
    /// Thread whose input state is shared.
    to: u32,
}

impl Attached {
    fn attach(from: u32, to: u32) -> Option<Self> {
        unsafe { AttachThreadInput(from, to, true) }
            .as_bool()
            .then_some(Self { from, to })
    }
}

impl Drop for Attached {
    fn drop(&mut self) {
        let _ = unsafe { AttachThreadInput(self.from, self.to, false) };
    }
}

pub(crate) fn conversion_mode_attached(thread: u32, fallback: WindowId) -> AttachedProbe {
    let me = current_thread();
    if thread == 0 || thread == me {
        return AttachedProbe::default();
    }
    let Some(_attached) = Attached::attach(me, thread) else {
        trace!(thread, "attach_thread_input_failed");
        return AttachedProbe::default();
    };

    let focus = window_id(unsafe { GetFocus() });
    let target = if focus.is_null() { fallback } else { focus };
    let conversion = conversion_mode_context(target);

    let mut keys = [0u8; 256];
    let hangul_key = unsafe { GetKeyboardState(&mut keys) }
        .ok()
        .map(|()| keys[VK_HANGUL]);

    AttachedProbe {
        conversion,
        hangul_key,
    }
}
