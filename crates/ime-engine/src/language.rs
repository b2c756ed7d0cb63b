//! Input languages and keyboard-layout classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Script or language selected by the active keyboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// English
    English,
    /// Japanese
    Japanese,
    /// Korean
    Korean,
    /// Simplified Chinese
    ChineseSimplified,
    /// Traditional Chinese
    ChineseTraditional,
    /// Vietnamese
    Vietnamese,
    /// Thai
    Thai,
    /// Hindi
    Hindi,
    /// Bengali
    Bengali,
    /// Tamil
    Tamil,
    /// Telugu
    Telugu,
    /// Nepali
    Nepali,
    /// Sinhala
    Sinhala,
    /// Myanmar
    Myanmar,
    /// Khmer
    Khmer,
    /// Lao
    Lao,
    /// Mongolian
    Mongolian,
    /// Arabic
    Arabic,
    /// Persian
    Persian,
    /// Hebrew
    Hebrew,
    /// Ukrainian
    Ukrainian,
    /// Russian
    Russian,
    /// Greek
    Greek,
    /// Any layout not listed above.
    Other,
}

impl Language {
    /// Simplified or Traditional Chinese.
    pub fn is_chinese(self) -> bool {
        matches!(self, Self::ChineseSimplified | Self::ChineseTraditional)
    }

    /// True if the taskbar input indicator draws a mode glyph for this
    /// language, which is what the pixel verifier reads.
    pub fn has_indicator_glyph(self) -> bool {
        matches!(self, Self::Japanese | Self::Korean) || self.is_chinese()
    }

    fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Japanese => "Japanese",
            Self::Korean => "Korean",
            Self::ChineseSimplified => "Chinese (Simplified)",
            Self::ChineseTraditional => "Chinese (Traditional)",
            Self::Vietnamese => "Vietnamese",
            Self::Thai => "Thai",
            Self::Hindi => "Hindi",
            Self::Bengali => "Bengali",
            Self::Tamil => "Tamil",
            Self::Telugu => "Telugu",
            Self::Nepali => "Nepali",
            Self::Sinhala => "Sinhala",
            Self::Myanmar => "Myanmar",
            Self::Khmer => "Khmer",
            Self::Lao => "Lao",
            Self::Mongolian => "Mongolian",
            Self::Arabic => "Arabic",
            Self::Persian => "Persian",
            Self::Hebrew => "Hebrew",
            Self::Ukrainian => "Ukrainian",
            Self::Russian => "Russian",
            Self::Greek => "Greek",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the engine publishes: the active language and whether its IME is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// Active language.
    pub language: Language,
    /// IME converting (on) or passing keys through (off).
    pub is_on: bool,
}

impl LanguageInfo {
    /// Construct a snapshot.
    pub const fn new(language: Language, is_on: bool) -> Self {
        Self { language, is_on }
    }
}

impl Default for LanguageInfo {
    fn default() -> Self {
        Self::new(Language::English, false)
    }
}

impl fmt::Display for LanguageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.language, if self.is_on { "on" } else { "off" })
    }
}

/// Language ids matched exactly, before falling back to the primary language.
const EXACT: &[(u16, Language)] = &[
    (0x0411, Language::Japanese),
    (0x0804, Language::ChineseSimplified),
    (0x0404, Language::ChineseTraditional),
    (0x0C04, Language::ChineseTraditional),
    (0x041E, Language::Thai),
    (0x042A, Language::Vietnamese),
    (0x0455, Language::Myanmar),
    (0x0453, Language::Khmer),
    (0x0454, Language::Lao),
    (0x0439, Language::Hindi),
    (0x0445, Language::Bengali),
    (0x0845, Language::Bengali),
    (0x0449, Language::Tamil),
    (0x044A, Language::Telugu),
    (0x0461, Language::Nepali),
    (0x045B, Language::Sinhala),
    (0x0450, Language::Mongolian),
    (0x0850, Language::Mongolian),
    (0x0401, Language::Arabic),
    (0x0C01, Language::Arabic),
    (0x3801, Language::Arabic),
    (0x0429, Language::Persian),
    (0x040D, Language::Hebrew),
    (0x0422, Language::Ukrainian),
    (0x0419, Language::Russian),
    (0x0408, Language::Greek),
];

/// Primary language (low byte of the language id) fallbacks.
const PRIMARY: &[(u16, Language)] = &[
    (0x12, Language::Korean),
    (0x01, Language::Arabic),
    (0x45, Language::Bengali),
    (0x50, Language::Mongolian),
    (0x09, Language::English),
];

/// Classify a keyboard layout handle. Only the low 16 bits (the language id)
/// are significant.
pub fn classify(layout: u32) -> Language {
    let lang_id = (layout & 0xFFFF) as u16;
    if let Some((_, l)) = EXACT.iter().find(|(id, _)| *id == lang_id) {
        return *l;
    }
    let primary = lang_id & 0xFF;
    PRIMARY
        .iter()
        .find(|(p, _)| *p == primary)
        .map_or(Language::Other, |(_, l)| *l)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn east_asian_layouts() {
        assert_eq!(classify(0x0411_0411), Language::Japanese);
        assert_eq!(classify(0xE020_0804), Language::ChineseSimplified);
        assert_eq!(classify(0x0404), Language::ChineseTraditional);
        assert_eq!(classify(0x0C04), Language::ChineseTraditional);
        assert_eq!(classify(0x0412_0412), Language::Korean);
        assert_eq!(classify(0x0812), Language::Korean);
    }

    #[test]
    fn english_variants_by_primary_language() {
        assert_eq!(classify(0x0409_0409), Language::English);
        assert_eq!(classify(0x0809), Language::English);
        assert_eq!(classify(0x1009), Language::English);
    }

    #[test]
    fn exact_before_primary() {
        assert_eq!(classify(0x3801), Language::Arabic);
        assert_eq!(classify(0x1401), Language::Arabic);
        assert_eq!(classify(0x0845), Language::Bengali);
        assert_eq!(classify(0x0850), Language::Mongolian);
        assert_eq!(classify(0x0419), Language::Russian);
        assert_eq!(classify(0x0819), Language::Other);
    }

    #[test]
    fn unknown_is_other() {
        assert_eq!(classify(0), Language::Other);
        assert_eq!(classify(0x0407), Language::Other);
        assert_eq!(classify(0xFFFF), Language::Other);
    }

    #[test]
    fn glyph_languages() {
        assert!(Language::Japanese.has_indicator_glyph());
        assert!(Language::ChineseTraditional.has_indicator_glyph());
        assert!(!Language::Thai.has_indicator_glyph());
        assert!(!Language::English.has_indicator_glyph());
    }

    #[test]
    fn display() {
        assert_eq!(
            LanguageInfo::new(Language::Korean, true).to_string(),
            "Korean/on"
        );
        assert_eq!(LanguageInfo::default().to_string(), "English/off");
    }

    proptest! {
        #[test]
        fn only_low_word_matters(layout in any::<u32>()) {
            prop_assert_eq!(classify(layout), classify(layout & 0xFFFF));
        }

        #[test]
        fn primary_korean_always_korean(sub in 0u16..=0xFF) {
            prop_assert_eq!(classify(u32::from((sub << 8) | 0x12)), Language::Korean);
        }
    }
}
