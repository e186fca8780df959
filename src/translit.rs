//! Transliteration of accented and non-Latin text to plain ASCII.
//!
//! OCR engines trained on ASCII routinely drop diacritics ("JOÃO" is read
//! as "JOAO"), so the transliterated form is one of the variations stored
//! for every source value.

use deunicode::deunicode;

/// Transliterate a string to ASCII.
///
/// Whitespace is left exactly as deunicode produces it: the generator
/// derives a separate whitespace-free variant and must not get one here
/// by accident.
pub fn transliterate(s: &str) -> String {
    deunicode(s)
}

/// Whether transliteration can change the string at all.
pub fn needs_transliteration(s: &str) -> bool {
    !s.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterate() {
        assert_eq!(transliterate("José García"), "Jose Garcia");
        assert_eq!(transliterate("JOÃO"), "JOAO");
        assert_eq!(transliterate("café"), "cafe");
        assert_eq!(transliterate("ÉCOLE"), "ECOLE");
    }

    #[test]
    fn test_transliterate_keeps_spacing() {
        assert_eq!(transliterate("  São  Paulo "), "  Sao  Paulo ");
        assert_eq!(transliterate(""), "");
    }

    #[test]
    fn test_needs_transliteration() {
        assert!(!needs_transliteration("JOAO 123"));
        assert!(!needs_transliteration(""));
        assert!(needs_transliteration("JOÃO"));
        assert!(needs_transliteration("Иван"));
    }
}
