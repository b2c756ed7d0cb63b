//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host processes whose reported keyboard layout cannot be trusted.
pub const DEFAULT_TERMINAL_PROCESSES: &[&str] = &[
    "powershell",
    "pwsh",
    "cmd",
    "WindowsTerminal",
    "conhost",
    "wezterm-gui",
    "alacritty",
    "mintty",
];

/// Accessible names of the taskbar input indicator (Japanese and English
/// shells).
pub const DEFAULT_INDICATOR_NAMES: &[&str] = &["入力インジケーター", "Input indicator"];

/// Window-handle state cache limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries kept before eviction kicks in.
    pub max_entries: usize,
    /// Entries not accessed for this long are evicted first.
    pub expiration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            expiration_secs: 30 * 60,
        }
    }
}

impl CacheConfig {
    /// Expiration as a duration.
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

/// Runtime configuration of the detection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reconciliation tick period.
    pub polling_interval_ms: u64,
    /// Periodic pixel re-verification period; 0 disables periodic checks.
    pub pixel_verification_interval_ms: u64,
    /// Terminal-class process names, compared without case.
    pub terminal_processes: Vec<String>,
    /// Accessible names that identify the taskbar input indicator.
    pub indicator_names: Vec<String>,
    /// Window-handle state cache limits.
    pub cache: CacheConfig,
    /// Capacity of the hook → loop signal queue.
    pub signal_queue: usize,
    /// Delay before re-reading the layout after a language switch chord.
    pub layout_reread_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: 100,
            pixel_verification_interval_ms: 5000,
            terminal_processes: DEFAULT_TERMINAL_PROCESSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            indicator_names: DEFAULT_INDICATOR_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cache: CacheConfig::default(),
            signal_queue: 64,
            layout_reread_delay_ms: 150,
        }
    }
}

impl EngineConfig {
    /// True if `process` names a terminal-class host.
    pub fn is_terminal(&self, process: &str) -> bool {
        self.terminal_processes
            .iter()
            .any(|t| t.eq_ignore_ascii_case(process))
    }

    /// Tick period, never below 1 ms.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms.max(1))
    }

    /// Pixel re-verification period; `None` when disabled.
    pub fn pixel_verification_interval(&self) -> Option<Duration> {
        (self.pixel_verification_interval_ms > 0)
            .then(|| Duration::from_millis(self.pixel_verification_interval_ms))
    }

    /// Delay before the post-switch layout re-read.
    pub fn layout_reread_delay(&self) -> Duration {
        Duration::from_millis(self.layout_reread_delay_ms)
    }
}
