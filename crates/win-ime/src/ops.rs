use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{Result as ImeResult, geom::Rect};

/// Opaque top-level or child window handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub isize);

impl WindowId {
    /// The null handle: "no window".
    pub const NULL: Self = Self(0);

    /// True for the null handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// TSF global compartments consulted for the Korean conversion mode, in
/// probe order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compartment {
    /// `GUID_COMPARTMENT_KEYBOARD_INPUTMODE_CONVERSION`
    Conversion,
    /// `GUID_COMPARTMENT_KEYBOARD_INPUTMODE_SENTENCE`
    Sentence,
    /// `GUID_COMPARTMENT_KEYBOARD_OPENCLOSE`
    OpenClose,
}

impl Compartment {
    /// All compartments in probe order.
    pub const ALL: [Self; 3] = [Self::Conversion, Self::Sentence, Self::OpenClose];
}

/// What could be read while attached to another thread's input state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttachedProbe {
    /// Conversion mode of the attached thread's focus window.
    pub conversion: Option<u32>,
    /// `VK_HANGUL` byte from the attached keyboard state.
    pub hangul_key: Option<u8>,
}

/// Window validity check, split out so caches can depend on it alone.
pub trait WindowProbe: Send + Sync {
    /// True if `w` still names a live window.
    fn is_window(&self, w: WindowId) -> bool;
}

/// Trait abstraction over the OS input-method surface to improve testability.
///
/// Methods are single probes. Composition into fallback chains happens in the
/// engine, so every method answers one narrow question and reports "could not
/// tell" as `None`.
pub trait ImeOps: WindowProbe {
    /// Window receiving keyboard input, or [`WindowId::NULL`].
    fn foreground_window(&self) -> WindowId;
    /// Thread that created `w`; 0 if unknown.
    fn window_thread(&self, w: WindowId) -> u32;
    /// Id of the calling thread.
    fn current_thread(&self) -> u32;
    /// Focus window of a GUI thread, if it has one.
    fn focus_window(&self, thread: u32) -> Option<WindowId>;
    /// Active keyboard layout (HKL) of `thread`, as a raw value.
    fn keyboard_layout(&self, thread: u32) -> u32;
    /// Executable name of the process owning `w`, without directory or
    /// extension.
    fn process_name(&self, w: WindowId) -> Option<String>;

    /// Open status via `WM_IME_CONTROL/IMC_GETOPENSTATUS` to the default IME
    /// window of `w`.
    fn open_status_message(&self, w: WindowId) -> Option<bool>;
    /// Open status via the input context of `w`.
    fn open_status_context(&self, w: WindowId) -> Option<bool>;
    /// True if a visible IME candidate window is owned by `owner`.
    fn candidate_window_visible(&self, owner: WindowId) -> bool;

    /// Conversion mode via the input context of `w`.
    fn conversion_mode_context(&self, w: WindowId) -> Option<u32>;
    /// Conversion mode via `WM_IME_CONTROL/IMC_GETCONVERSIONMODE`.
    fn conversion_mode_message(&self, w: WindowId) -> Option<u32>;
    /// Attach to `thread`'s input state and read what is available there.
    /// `fallback` is used when the attached thread has no focus window.
    fn conversion_mode_attached(&self, thread: u32, fallback: WindowId) -> AttachedProbe;
    /// Value of a TSF global compartment.
    fn tsf_compartment(&self, c: Compartment) -> Option<i32>;
    /// Length of the pending composition string of `w`.
    fn composition_length(&self, w: WindowId) -> Option<usize>;

    /// Screen rectangle of the taskbar input indicator whose accessible name
    /// contains one of `names`.
    fn find_input_indicator(&self, names: &[String]) -> ImeResult<Option<Rect>>;
    /// Capture `rect` from the screen as top-down 32-bit BGRA rows.
    fn capture_region(&self, rect: Rect) -> ImeResult<Vec<u8>>;
    /// Current mouse cursor position.
    fn cursor_pos(&self) -> Option<(i32, i32)>;
}

/// Production implementation of [`ImeOps`] delegating to Win32.
#[cfg(windows)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RealImeOps;

#[cfg(windows)]
impl WindowProbe for RealImeOps {
    fn is_window(&self, w: WindowId) -> bool {
        crate::sys::window::is_window(w)
    }
}

#[cfg(windows)]
impl ImeOps for RealImeOps {
    fn foreground_window(&self) -> WindowId {
        crate::sys::window::foreground_window()
    }
    fn window_thread(&self, w: WindowId) -> u32 {
        crate::sys::window::window_thread(w)
    }
    fn current_thread(&self) -> u32 {
        crate::sys::window::current_thread()
    }
    fn focus_window(&self, thread: u32) -> Option<WindowId> {
        crate::sys::window::gui_focus(thread)
    }
    fn keyboard_layout(&self, thread: u32) -> u32 {
        crate::sys::window::keyboard_layout(thread)
    }
    fn process_name(&self, w: WindowId) -> Option<String> {
        crate::sys::process::process_name(w)
    }
    fn open_status_message(&self, w: WindowId) -> Option<bool> {
        crate::sys::imm::open_status_message(w)
    }
    fn open_status_context(&self, w: WindowId) -> Option<bool> {
        crate::sys::imm::open_status_context(w)
    }
    fn candidate_window_visible(&self, owner: WindowId) -> bool {
        crate::sys::window::candidate_window_visible(owner)
    }
    fn conversion_mode_context(&self, w: WindowId) -> Option<u32> {
        crate::sys::imm::conversion_mode_context(w)
    }
    fn conversion_mode_message(&self, w: WindowId) -> Option<u32> {
        crate::sys::imm::conversion_mode_message(w)
    }
    fn conversion_mode_attached(&self, thread: u32, fallback: WindowId) -> AttachedProbe {
        crate::sys::imm::conversion_mode_attached(thread, fallback)
    }
    fn tsf_compartment(&self, c: Compartment) -> Option<i32> {
        crate::sys::tsf::compartment_value(c)
    }
    fn composition_length(&self, w: WindowId) -> Option<usize> {
        crate::sys::imm::composition_length(w)
    }
    fn find_input_indicator(&self, names: &[String]) -> ImeResult<Option<Rect>> {
        crate::sys::uia::find_input_indicator(names)
    }
    fn capture_region(&self, rect: Rect) -> ImeResult<Vec<u8>> {
        crate::sys::capture::capture_region(rect)
    }
    fn cursor_pos(&self) -> Option<(i32, i32)> {
        crate::sys::window::cursor_pos()
    }
}

/// Scripted OS state served by [`MockImeOps`].
///
/// Every probe defaults to "could not tell", so a fresh mock behaves like a
/// system where all input-method queries fail.
#[derive(Clone, Debug, Default)]
pub struct MockImeState {
    /// Foreground window.
    pub foreground: WindowId,
    /// Windows considered alive. The foreground window is always alive.
    pub live: HashSet<WindowId>,
    /// Window → owning thread.
    pub threads: HashMap<WindowId, u32>,
    /// Thread id reported for the caller.
    pub current_thread: u32,
    /// Thread → GUI focus window.
    pub focus: HashMap<u32, WindowId>,
    /// Thread → keyboard layout; threads not listed report `default_layout`.
    pub layouts: HashMap<u32, u32>,
    /// Layout reported for threads without an explicit entry.
    pub default_layout: u32,
    /// Window → process name.
    pub processes: HashMap<WindowId, String>,
    /// Answer of the `IMC_GETOPENSTATUS` message.
    pub open_message: Option<bool>,
    /// Window → input-context open status.
    pub open_context: HashMap<WindowId, bool>,
    /// Owners with a visible candidate window.
    pub candidates: HashSet<WindowId>,
    /// Input-context conversion mode.
    pub conversion_context: Option<u32>,
    /// `IMC_GETCONVERSIONMODE` answer.
    pub conversion_message: Option<u32>,
    /// Result of the thread-attach probe.
    pub attached: AttachedProbe,
    /// TSF compartment values.
    pub compartments: HashMap<Compartment, i32>,
    /// Composition string length.
    pub composition: Option<usize>,
    /// Input indicator rectangle.
    pub indicator: Option<Rect>,
    /// Captured pixels; `None` makes capture fail.
    pub pixels: Option<Vec<u8>>,
    /// Cursor position.
    pub cursor: Option<(i32, i32)>,
}

/// Simple mock implementation for tests.
#[derive(Clone, Default)]
pub struct MockImeOps {
    /// Scripted state.
    state: Arc<Mutex<MockImeState>>,
    /// Probe names in call order.
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockImeOps {
    /// Mock where every input-method probe fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the scripted state.
    pub fn update(&self, f: impl FnOnce(&mut MockImeState)) {
        f(&mut self.state.lock());
    }

    /// Make `w` the foreground window, owned by `thread`, with `layout`.
    pub fn set_foreground(&self, w: WindowId, thread: u32, layout: u32) {
        self.update(|s| {
            s.foreground = w;
            if !w.is_null() {
                s.live.insert(w);
                s.threads.insert(w, thread);
                s.layouts.insert(thread, layout);
            }
        });
    }

    /// Set the process name of `w`.
    pub fn set_process(&self, w: WindowId, name: &str) {
        self.update(|s| {
            s.processes.insert(w, name.to_string());
        });
    }

    /// Mark `w` as destroyed.
    pub fn destroy(&self, w: WindowId) {
        self.update(|s| {
            s.live.remove(&w);
        });
    }

    /// Set the input indicator location and the pixels a capture returns.
    pub fn set_indicator(&self, rect: Option<Rect>, pixels: Option<Vec<u8>>) {
        self.update(|s| {
            s.indicator = rect;
            s.pixels = pixels;
        });
    }

    /// True if a probe named `s` has been called.
    pub fn calls_contains(&self, s: &str) -> bool {
        self.calls.lock().iter().any(|x| x == s)
    }

    /// Number of calls to the probe named `s`.
    pub fn call_count(&self, s: &str) -> usize {
        self.calls.lock().iter().filter(|x| *x == s).count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn note(&self, s: &str) {
        self.calls.lock().push(s.to_string());
    }

    fn read<T>(&self, f: impl FnOnce(&MockImeState) -> T) -> T {
        f(&self.state.lock())
    }
}

impl WindowProbe for MockImeOps {
    fn is_window(&self, w: WindowId) -> bool {
        self.note("is_window");
        self.read(|s| !w.is_null() && (s.live.contains(&w) || s.foreground == w))
    }
}

impl ImeOps for MockImeOps {
    fn foreground_window(&self) -> WindowId {
        self.read(|s| s.foreground)
    }
    fn window_thread(&self, w: WindowId) -> u32 {
        self.read(|s| s.threads.get(&w).copied().unwrap_or_default())
    }
    fn current_thread(&self) -> u32 {
        self.read(|s| s.current_thread)
    }
    fn focus_window(&self, thread: u32) -> Option<WindowId> {
        self.read(|s| s.focus.get(&thread).copied())
    }
    fn keyboard_layout(&self, thread: u32) -> u32 {
        self.note("keyboard_layout");
        self.read(|s| s.layouts.get(&thread).copied().unwrap_or(s.default_layout))
    }
    fn process_name(&self, w: WindowId) -> Option<String> {
        self.read(|s| s.processes.get(&w).cloned())
    }
    fn open_status_message(&self, _w: WindowId) -> Option<bool> {
        self.note("open_status_message");
        self.read(|s| s.open_message)
    }
    fn open_status_context(&self, w: WindowId) -> Option<bool> {
        self.note("open_status_context");
        self.read(|s| s.open_context.get(&w).copied())
    }
    fn candidate_window_visible(&self, owner: WindowId) -> bool {
        self.note("candidate_window_visible");
        self.read(|s| s.candidates.contains(&owner))
    }
    fn conversion_mode_context(&self, _w: WindowId) -> Option<u32> {
        self.note("conversion_mode_context");
        self.read(|s| s.conversion_context)
    }
    fn conversion_mode_message(&self, _w: WindowId) -> Option<u32> {
        self.note("conversion_mode_message");
        self.read(|s| s.conversion_message)
    }
    fn conversion_mode_attached(&self, _thread: u32, _fallback: WindowId) -> AttachedProbe {
        self.note("conversion_mode_attached");
        self.read(|s| s.attached)
    }
    fn tsf_compartment(&self, c: Compartment) -> Option<i32> {
        self.note("tsf_compartment");
        self.read(|s| s.compartments.get(&c).copied())
    }
    fn composition_length(&self, _w: WindowId) -> Option<usize> {
        self.note("composition_length");
        self.read(|s| s.composition)
    }
    fn find_input_indicator(&self, _names: &[String]) -> ImeResult<Option<Rect>> {
        self.note("find_input_indicator");
        Ok(self.read(|s| s.indicator))
    }
    fn capture_region(&self, rect: Rect) -> ImeResult<Vec<u8>> {
        self.note("capture_region");
        self.read(|s| s.pixels.clone())
            .ok_or_else(|| crate::Error::Os(format!("capture failed for {rect:?}")))
    }
    fn cursor_pos(&self) -> Option<(i32, i32)> {
        self.read(|s| s.cursor)
    }
}
