use std::convert::TryFrom;

use crate::Vk;

/// Modifier keys as seen by the low-level keyboard hook.
///
/// Left and right variants collapse into one modifier; the hook only needs to
/// know whether a key participates in a chord.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Modifier {
    /// Shift
    Shift,
    /// Control
    Control,
    /// Alt (`VK_MENU`)
    Alt,
    /// Windows key
    Win,
}

impl Modifier {
    /// Virtual keys whose instantaneous state reflects this modifier.
    ///
    /// The generic code (e.g. `VK_SHIFT`) is excluded because the low-level
    /// hook reports sided codes and `GetAsyncKeyState` answers for both.
    pub fn keys(self) -> &'static [Vk] {
        match self {
            Self::Shift => &[Vk::LSHIFT, Vk::RSHIFT],
            Self::Control => &[Vk::LCONTROL, Vk::RCONTROL],
            Self::Alt => &[Vk::LMENU, Vk::RMENU],
            Self::Win => &[Vk::LWIN, Vk::RWIN],
        }
    }

    /// Lowercase display name of this modifier.
    pub fn label(self) -> String {
        match self {
            Self::Shift => "shift".to_string(),
            Self::Control => "ctrl".to_string(),
            Self::Alt => "alt".to_string(),
            Self::Win => "win".to_string(),
        }
    }
}

impl TryFrom<Vk> for Modifier {
    type Error = ();
    fn try_from(k: Vk) -> Result<Self, Self::Error> {
        match k {
            Vk::SHIFT | Vk::LSHIFT | Vk::RSHIFT => Ok(Self::Shift),
            Vk::CONTROL | Vk::LCONTROL | Vk::RCONTROL => Ok(Self::Control),
            Vk::MENU | Vk::LMENU | Vk::RMENU => Ok(Self::Alt),
            Vk::LWIN | Vk::RWIN => Ok(Self::Win),
            _ => Err(()),
        }
    }
}
