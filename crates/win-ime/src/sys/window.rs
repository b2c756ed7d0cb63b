use windows::{
    Win32::{
        Foundation::{BOOL, HWND, LPARAM, POINT, RECT, TRUE},
        System::Threading::GetCurrentThreadId,
        UI::{
            Input::KeyboardAndMouse::GetKeyboardLayout,
            WindowsAndMessaging::{
                EnumWindows, GUITHREADINFO, GW_OWNER, GetClassNameW, GetCursorPos,
                GetForegroundWindow, GetGUIThreadInfo, GetWindow, GetWindowRect,
                GetWindowThreadProcessId, IsWindow, IsWindowVisible,
            },
        },
    },
};

use super::{hwnd, window_id};
use crate::{MIN_CANDIDATE_SIDE, Rect, WindowId, is_candidate_class};

pub(crate) fn is_window(w: WindowId) -> bool {
    !w.is_null() && unsafe { IsWindow(hwnd(w)) }.as_bool()
}

pub(crate) fn foreground_window() -> WindowId {
    window_id(unsafe { GetForegroundWindow() })
}

pub(crate) fn window_thread(w: WindowId) -> u32 {
    if w.is_null() {
        return 0;
    }
    unsafe { GetWindowThreadProcessId(hwnd(w), None) }
}

pub(crate) fn current_thread() -> u32 {
    unsafe { GetCurrentThreadId() }
}

pub(crate) fn gui_focus(thread: u32) -> Option<WindowId> {
    let mut info = GUITHREADINFO {
        cbSize: size_of::<GUITHREADINFO>() as u32,
        ..Default::default()
    };
    unsafe { GetGUIThreadInfo(thread, &mut info) }.ok()?;
    let focus = window_id(info.hwndFocus);
    (!focus.is_null()).then_some(focus)
}

pub(crate) fn keyboard_layout(thread: u32) -> u32 {
    let hkl = unsafe { GetKeyboardLayout(thread) };
    (hkl.0 as usize & 0xFFFF_FFFF) as u32
}

pub(crate) fn cursor_pos() -> Option<(i32, i32)> {
    let mut pt = POINT::default();
    unsafe { GetCursorPos(&mut pt) }.ok()?;
    Some((pt.x, pt.y))
}

pub(crate) fn window_rect(h: HWND) -> Option<Rect> {
    let mut r = RECT::default();
    unsafe { GetWindowRect(h, &mut r) }.ok()?;
    Some(Rect::from_edges(r.left, r.top, r.right, r.bottom))
}

fn class_name(h: HWND) -> String {
    let mut buf = [0u16; 256];
    let n = unsafe { GetClassNameW(h, &mut buf) };
    String::from_utf16_lossy(&buf[..n.max(0) as usize])
}

/// Enumeration state for [`candidate_window_visible`].
struct OwnedScan {
    /// Window whose owned popups are inspected.
    owner: HWND,
    /// Set once a candidate window has been seen.
    found: bool,
}

unsafe extern "system" fn scan_owned(h: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam carries the `OwnedScan` borrowed for the enumeration.
    let scan = unsafe { &mut *(lparam.0 as *mut OwnedScan) };
    if !unsafe { IsWindowVisible(h) }.as_bool() {
        return TRUE;
    }
    let owner = unsafe { GetWindow(h, GW_OWNER) }.unwrap_or_default();
    if owner != scan.owner {
        return TRUE;
    }
    let big_enough = window_rect(h).is_some_and(|r| r.at_least(MIN_CANDIDATE_SIDE));
    if big_enough && is_candidate_class(&class_name(h)) {
        scan.found = true;
        return BOOL(0);
    }
    TRUE
}

pub(crate) fn candidate_window_visible(owner: WindowId) -> bool {
    if owner.is_null() {
        return false;
    }
    let mut scan = OwnedScan {
        owner: hwnd(owner),
        found: false,
    };
    // Stopping early makes EnumWindows report an error; the flag is what counts.
    let _ = unsafe { EnumWindows(Some(scan_owned), LPARAM(&mut scan as *mut OwnedScan as isize)) };
    scan.found
}
