use std::fmt;

use serde::{Deserialize, Serialize};

/// A Windows virtual-key code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vk(pub u16);

impl Vk {
    /// Kana on Japanese keyboards, Hangul/English on Korean keyboards.
    pub const KANA: Self = Self(0x15);
    /// Alias of [`Vk::KANA`] for Korean layouts.
    pub const HANGUL: Self = Self(0x15);
    /// Standard "IME on" key.
    pub const IME_ON: Self = Self(0x16);
    /// Hankaku/Zenkaku (半角/全角) on Japanese keyboards.
    pub const KANJI: Self = Self(0x19);
    /// Standard "IME off" key.
    pub const IME_OFF: Self = Self(0x1A);
    /// Henkan (変換).
    pub const CONVERT: Self = Self(0x1C);
    /// Muhenkan (無変換).
    pub const NONCONVERT: Self = Self(0x1D);
    /// Space bar.
    pub const SPACE: Self = Self(0x20);
    /// Generic Shift.
    pub const SHIFT: Self = Self(0x10);
    /// Generic Control.
    pub const CONTROL: Self = Self(0x11);
    /// Generic Alt.
    pub const MENU: Self = Self(0x12);
    /// Left Windows key.
    pub const LWIN: Self = Self(0x5B);
    /// Right Windows key.
    pub const RWIN: Self = Self(0x5C);
    /// Left Shift.
    pub const LSHIFT: Self = Self(0xA0);
    /// Right Shift.
    pub const RSHIFT: Self = Self(0xA1);
    /// Left Control.
    pub const LCONTROL: Self = Self(0xA2);
    /// Right Control.
    pub const RCONTROL: Self = Self(0xA3);
    /// Left Alt.
    pub const LMENU: Self = Self(0xA4);
    /// Right Alt.
    pub const RMENU: Self = Self(0xA5);
    /// Eisu/alphanumeric "IME off" key on some Japanese keyboards.
    pub const OEM_AUTO: Self = Self(0xF3);
    /// "IME on" key on some Japanese keyboards.
    pub const OEM_ENLW: Self = Self(0xF4);

    /// Keys that switch IME mode directly when pressed.
    pub const IME_TOGGLES: [Self; 8] = [
        Self::KANA,
        Self::KANJI,
        Self::CONVERT,
        Self::NONCONVERT,
        Self::IME_ON,
        Self::IME_OFF,
        Self::OEM_AUTO,
        Self::OEM_ENLW,
    ];

    /// Raw code as passed to Win32 key-state APIs.
    pub const fn code(self) -> u16 {
        self.0
    }

    /// True for the keys in [`Vk::IME_TOGGLES`].
    pub fn is_ime_toggle(self) -> bool {
        Self::IME_TOGGLES.contains(&self)
    }

    /// True for any Shift variant.
    pub const fn is_shift(self) -> bool {
        matches!(self.0, 0x10 | 0xA0 | 0xA1)
    }

    /// True for Shift, Control, Alt and Windows keys in any left/right variant.
    pub fn is_modifier(self) -> bool {
        crate::Modifier::try_from(self).is_ok()
    }

    /// Short human-readable name used in logs.
    pub fn name(self) -> String {
        match self {
            Self::KANA => "KANA".to_string(),
            Self::KANJI => "KANJI".to_string(),
            Self::CONVERT => "CONVERT".to_string(),
            Self::NONCONVERT => "NONCONVERT".to_string(),
            Self::IME_ON => "IME_ON".to_string(),
            Self::IME_OFF => "IME_OFF".to_string(),
            Self::OEM_AUTO => "OEM_AUTO".to_string(),
            Self::OEM_ENLW => "OEM_ENLW".to_string(),
            Self::SPACE => "SPACE".to_string(),
            other => match crate::Modifier::try_from(other) {
                Ok(m) => m.label(),
                Err(()) => format!("0x{:02X}", other.0),
            },
        }
    }
}

impl From<u32> for Vk {
    fn from(raw: u32) -> Self {
        Self((raw & 0xFFFF) as u16)
    }
}

impl fmt::Display for Vk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
