//! Lifecycle handshake between [`KeyboardHook`](crate::KeyboardHook) and its
//! hook thread.
//!
//! The hook thread registers itself after installing the hook. Once `start`
//! has given up on the thread, or `stop` has run, registration is refused
//! and the thread must uninstall and exit on its own.

#![cfg_attr(not(windows), allow(dead_code))]

use std::mem;

use parking_lot::Mutex;

/// Where the hook thread is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No thread registered yet.
    Idle,
    /// Hook installed; the thread with this id is pumping messages.
    Running(u32),
    /// The owner has abandoned the thread.
    Cancelled,
}

/// Shared between the owner and the hook thread.
pub(crate) struct HookGate {
    /// Current phase.
    phase: Mutex<Phase>,
    /// Breaks the message loop of a registered thread.
    quit: fn(u32),
}

impl HookGate {
    /// New idle gate; `quit` is called with the thread id on cancellation.
    pub(crate) fn new(quit: fn(u32)) -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
            quit,
        }
    }

    /// Re-arm for a fresh hook thread.
    pub(crate) fn reset(&self) {
        *self.phase.lock() = Phase::Idle;
    }

    /// Called by the hook thread once its hook is installed. Returns false
    /// if the owner already cancelled; the caller must then uninstall.
    pub(crate) fn register(&self, thread_id: u32) -> bool {
        let mut phase = self.phase.lock();
        if *phase == Phase::Cancelled {
            return false;
        }
        *phase = Phase::Running(thread_id);
        true
    }

    /// Abandon the hook thread, asking a registered one to quit.
    pub(crate) fn cancel(&self) {
        let prev = mem::replace(&mut *self.phase.lock(), Phase::Cancelled);
        if let Phase::Running(id) = prev {
            (self.quit)(id);
        }
    }

    /// True once `cancel` has run.
    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        *self.phase.lock() == Phase::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    static QUIT_SENT: AtomicU32 = AtomicU32::new(0);

    fn record_quit(id: u32) {
        QUIT_SENT.store(id, Ordering::SeqCst);
    }

    #[test]
    fn registration_after_cancel_is_refused() {
        let gate = HookGate::new(|_| {});
        gate.cancel();
        assert!(!gate.register(7));
        assert!(gate.is_cancelled());
        gate.reset();
        assert!(gate.register(7));
        assert!(!gate.is_cancelled());
    }

    #[test]
    fn cancel_quits_registered_thread_once() {
        let gate = HookGate::new(record_quit);
        assert!(gate.register(11));
        gate.cancel();
        assert_eq!(QUIT_SENT.swap(0, Ordering::SeqCst), 11);
        gate.cancel();
        assert_eq!(QUIT_SENT.load(Ordering::SeqCst), 0);
    }
}
