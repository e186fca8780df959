//! OCR-confusable variations of a source string.
//!
//! Every variation is derived from the original text on its own; nothing is
//! chained, so a case fold never feeds a substitution and two confusable
//! substitutions are never combined in one candidate.

use std::collections::BTreeSet;

use crate::translit;

/// Characters OCR engines commonly mistake for one another, in both directions.
pub const CONFUSABLES: [(char, char); 12] = [
    ('O', '0'),
    ('0', 'O'),
    ('I', '1'),
    ('1', 'I'),
    ('Z', '2'),
    ('2', 'Z'),
    ('E', '3'),
    ('3', 'E'),
    ('A', '4'),
    ('4', 'A'),
    ('S', '5'),
    ('5', 'S'),
];

/// Look up the character a confusable is usually misread as.
pub fn confusable_of(c: char) -> Option<char> {
    CONFUSABLES
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
}

/// Generate the variation set for `text`. The set always contains `text`.
///
/// Callers filter out empty values; an empty input simply yields `{""}`.
pub fn generate(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    out.insert(text.to_string());
    out.insert(text.to_uppercase());
    out.insert(text.to_lowercase());

    if translit::needs_transliteration(text) {
        out.insert(translit::transliterate(text));
    }

    out.insert(text.replace(' ', ""));

    for c in text.chars() {
        let Some(replacement) = confusable_of(c) else {
            continue;
        };
        // Every occurrence of this character class, one class at a time.
        let substituted = text.replace(c, &replacement.to_string());
        out.insert(substituted.to_uppercase());
        out.insert(substituted.to_lowercase());
        out.insert(substituted);
    }

    out
}
