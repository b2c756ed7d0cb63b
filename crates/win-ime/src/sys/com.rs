//! Per-thread COM initialisation.

use std::cell::RefCell;

use tracing::debug;
use windows::Win32::System::Com::{COINIT_APARTMENTTHREADED, CoInitializeEx, CoUninitialize};

/// Balances a successful `CoInitializeEx` when the thread exits.
struct ComGuard {
    /// Whether this thread's initialisation must be undone.
    owned: bool,
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}

thread_local! {
    static COM: RefCell<Option<ComGuard>> = const { RefCell::new(None) };
}

/// Make sure COM is initialised on the calling thread.
///
/// A thread already initialised in another apartment keeps its apartment;
/// COM calls still work there.
pub(super) fn ensure() {
    COM.with(|c| {
        let mut c = c.borrow_mut();
        if c.is_some() {
            return;
        }
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if hr.is_err() {
            debug!(hr = ?hr, "co_initialize_declined");
        }
        *c = Some(ComGuard { owned: hr.is_ok() });
    });
}
