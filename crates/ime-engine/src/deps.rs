use win_hook::{KeyboardHook, SignalSink};

use crate::Result;

// ---- Keyboard hook abstraction ----

/// Minimal keyboard hook API used by the monitor.
pub trait HookApi: Send + Sync {
    /// Begin delivering signals to `sink`.
    fn start(&self, sink: SignalSink) -> Result<()>;
    /// Stop delivering signals. Idempotent.
    fn stop(&self);
}

/// System-wide `WH_KEYBOARD_LL` hook.
#[derive(Default)]
pub struct RealHookApi {
    /// Hook thread owner.
    inner: KeyboardHook,
}

impl RealHookApi {
    /// Idle hook; installed by [`HookApi::start`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl HookApi for RealHookApi {
    fn start(&self, sink: SignalSink) -> Result<()> {
        Ok(self.inner.start(sink)?)
    }
    fn stop(&self) {
        self.inner.stop();
    }
}
