//! Per-window IME state memory.
//!
//! Used by the Korean tracker when the OS cannot report the Hangul mode: the
//! last known state is stored for the window being left and restored when a
//! window is focused again. Entries are keyed by raw window handle, so every
//! lookup re-checks that the handle still names a live window.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;
use win_ime::{WindowId, WindowProbe};

use crate::config::CacheConfig;

/// One remembered state.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    /// IME state for the window.
    state: bool,
    /// Last `set` or successful `try_get`.
    last_access: Instant,
}

/// Bounded window → IME state map. Clones share storage.
#[derive(Clone)]
pub struct WindowStateCache {
    /// Access-ordered entries.
    map: Arc<Mutex<LruCache<WindowId, CacheEntry>>>,
    /// Liveness check for handles.
    probe: Arc<dyn WindowProbe>,
    /// Entry count that triggers eviction.
    cap: usize,
    /// Idle time after which an entry is evicted first.
    expiration: Duration,
}

impl WindowStateCache {
    /// Create an empty cache.
    pub fn new(probe: Arc<dyn WindowProbe>, cfg: &CacheConfig) -> Self {
        Self {
            map: Arc::new(Mutex::new(LruCache::unbounded())),
            probe,
            cap: cfg.max_entries.max(1),
            expiration: cfg.expiration(),
        }
    }

    /// Remember `state` for `window`.
    pub fn set(&self, window: WindowId, state: bool) {
        self.set_at(window, state, Instant::now());
    }

    /// Look up the state for `window`, dropping the entry if the window is
    /// gone.
    pub fn try_get(&self, window: WindowId) -> Option<bool> {
        self.try_get_at(window, Instant::now())
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.map.lock().clear();
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.map.lock().len()
    }

    pub(crate) fn set_at(&self, window: WindowId, state: bool, now: Instant) {
        if window.is_null() {
            return;
        }
        let over = {
            let mut map = self.map.lock();
            map.put(
                window,
                CacheEntry {
                    state,
                    last_access: now,
                },
            );
            map.len() > self.cap
        };
        if over {
            self.evict(now);
        }
    }

    pub(crate) fn try_get_at(&self, window: WindowId, now: Instant) -> Option<bool> {
        if window.is_null() || !self.map.lock().contains(&window) {
            return None;
        }
        let alive = self.probe.is_window(window);
        let mut map = self.map.lock();
        if !alive {
            map.pop(&window);
            trace!(window = %window, "window_cache_drop_dead");
            return None;
        }
        let entry = map.get_mut(&window)?;
        entry.last_access = now;
        Some(entry.state)
    }

    /// Shrink to the cap: dead or idle entries first, then least recently
    /// used.
    fn evict(&self, now: Instant) {
        let keys: Vec<(WindowId, Instant)> = self
            .map
            .lock()
            .iter()
            .map(|(k, e)| (*k, e.last_access))
            .collect();
        let stale: Vec<WindowId> = keys
            .into_iter()
            .filter(|(k, at)| {
                now.saturating_duration_since(*at) > self.expiration || !self.probe.is_window(*k)
            })
            .map(|(k, _)| k)
            .collect();

        let mut map = self.map.lock();
        for k in &stale {
            map.pop(k);
        }
        let mut dropped = stale.len();
        while map.len() > self.cap {
            if map.pop_lru().is_none() {
                break;
            }
            dropped += 1;
        }
        trace!(dropped, remaining = map.len(), "window_cache_evict");
    }
}
