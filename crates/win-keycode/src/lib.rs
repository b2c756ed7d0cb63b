//! win-keycode: Windows virtual-key codes for IME tracking.
//!
//! - `Vk`: newtype over a raw virtual-key code with named constants for the
//!   keys the IME engine cares about (IME toggles, modifiers, Space).
//! - `Modifier`: modifier keys with conversions to/from `Vk`, collapsing the
//!   left/right variants the low-level hook reports.
//!
//! Codes are the values from `WinUser.h`; the hook receives them verbatim in
//! `KBDLLHOOKSTRUCT::vkCode`.

mod vk;
pub use vk::Vk;

mod modifiers;
pub use modifiers::Modifier;
