//! Win32 implementations behind [`crate::RealImeOps`].

use std::ffi::c_void;

use windows::Win32::Foundation::HWND;

use crate::WindowId;

pub(crate) mod capture;
mod com;
pub(crate) mod imm;
pub(crate) mod process;
pub(crate) mod tsf;
pub(crate) mod uia;
pub(crate) mod window;

/// Timeout for messages sent to another thread's IME window.
const MESSAGE_TIMEOUT_MS: u32 = 100;

fn hwnd(w: WindowId) -> HWND {
    HWND(w.0 as *mut c_void)
}

fn window_id(h: HWND) -> WindowId {
    WindowId(h.0 as isize)
}
