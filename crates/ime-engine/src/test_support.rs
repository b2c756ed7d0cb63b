//! Test support utilities for ime-engine unit and integration tests.
//! These helpers are public so the integration suite can drive the monitor
//! without a real keyboard hook.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{sync::broadcast, time::timeout};
use win_hook::{Error as HookError, HookSignal, SignalSink};

use crate::{Error, HookApi, LanguageInfo, MonitorEvent, Result};

/// Hook stand-in that hands its sink to the test.
#[derive(Default)]
pub struct MockHookApi {
    /// Sink received by `start`.
    sink: Mutex<Option<SignalSink>>,
    /// Make the next `start` fail.
    fail: AtomicBool,
    /// Number of `stop` calls.
    stops: AtomicUsize,
}

impl MockHookApi {
    /// Idle mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `start` fail as if the hook could not be installed.
    pub fn fail_start(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Push a signal as the hook thread would. False if not started or full.
    pub fn emit(&self, sig: HookSignal) -> bool {
        self.sink
            .lock()
            .as_ref()
            .is_some_and(|s| s.try_send(sig).is_ok())
    }

    /// True while a sink is held.
    pub fn is_running(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Number of `stop` calls seen.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl HookApi for MockHookApi {
    fn start(&self, sink: SignalSink) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Hook(HookError::HookInstall));
        }
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sink.lock().take();
    }
}

/// Receive the next `StateChanged` within `timeout_ms`, skipping cursor events.
pub async fn next_state(
    rx: &mut broadcast::Receiver<MonitorEvent>,
    timeout_ms: u64,
) -> Option<LanguageInfo> {
    timeout(Duration::from_millis(timeout_ms), async {
        loop {
            match rx.recv().await {
                Ok(MonitorEvent::StateChanged(info)) => return Some(info),
                Ok(MonitorEvent::CursorMoved { .. }) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
