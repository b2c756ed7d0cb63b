//! ime-engine: decides whether the input method of the foreground window is
//! on, and for which language.
//!
//! Windows offers no single trustworthy answer: cross-process IME queries
//! fail or lie depending on the IME, the host process and the language. The
//! engine reconciles several sources on every pass:
//! - the OS query chains in [`query`] (message probes, input contexts, TSF)
//! - keyboard hook signals (toggle keys, language switch, Chinese gestures)
//! - the taskbar input indicator, read by [`PixelVerifier`]
//! - per-window memory in [`WindowStateCache`]
//!
//! [`Monitor::start`] spawns the reconciliation loop and returns a
//! [`MonitorHandle`]; results arrive as [`MonitorEvent`]s. [`Engine`] is the
//! loop body and can be stepped directly.
//!
//! All OS access goes through [`win_ime::ImeOps`], so everything here runs
//! against [`win_ime::MockImeOps`] off Windows.

mod config;
mod deps;
mod engine;
mod error;
mod language;
mod monitor;
mod pixel;
pub mod query;
pub mod state;
pub mod test_support;
pub mod tracker;
mod window_cache;

pub use config::{CacheConfig, DEFAULT_INDICATOR_NAMES, DEFAULT_TERMINAL_PROCESSES, EngineConfig};
pub use deps::{HookApi, RealHookApi};
pub use engine::{Engine, SignalEffect};
pub use error::{Error, Result};
pub use language::{Language, LanguageInfo, classify};
pub use monitor::{Monitor, MonitorEvent, MonitorHandle};
pub use pixel::{PixelVerifier, RECT_CACHE_TTL, RESULT_CACHE_TTL, classify_ratio, dark_ratio};
pub use test_support::MockHookApi;
pub use window_cache::WindowStateCache;
