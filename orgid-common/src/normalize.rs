//! Name normalization shared by indexing and lookup
//!
//! The normalized form is the index key, so both sides of a lookup must
//! go through [`normalize`]. Steps, in order:
//! 1. Strip everything that is not alphanumeric, underscore or whitespace
//! 2. Transliterate accented characters to unaccented ASCII
//! 3. Collapse whitespace runs to one space and trim
//! 4. Lowercase every word that is not already all-uppercase (acronyms keep their casing)
//!
//! Casing is decided on the transliterated word, so letters that only gain
//! a case through decomposition (`ℂ` becomes `C`) are judged as what they
//! turn into. This keeps the function idempotent.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize a name or query fragment into its index key.
///
/// Total: empty input yields an empty string.
///
/// # Examples
/// ```
/// use orgid_common::normalize::normalize;
///
/// assert_eq!(normalize("  Université   de Montréal "), "universite de montreal");
/// assert_eq!(normalize("MIT Center"), "MIT center");
/// assert_eq!(normalize("Johns-Hopkins, Inc."), "johnshopkins inc");
/// ```
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let stripped: String = text
        .chars()
        .filter(|c| is_word_char(*c) || c.is_whitespace())
        .collect();

    transliterate(&stripped)
        .split_whitespace()
        .map(|word| {
            if is_upper_word(word) {
                word.to_string()
            } else {
                word.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the word has at least one cased character and no lowercase ones.
///
/// Digits and punctuation are ignored, so `"AT&T"` and `"U2"` count as uppercase.
pub(crate) fn is_upper_word(word: &str) -> bool {
    let mut has_cased = false;
    for c in word.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace accented characters with their closest unaccented equivalents.
///
/// Decomposes (NFKD) and drops combining marks, then maps the Latin letters
/// that have no decomposition. Characters outside Latin script without a
/// mapping are kept as-is so non-Latin names still produce distinct keys.
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        if let Some(mapped) = latin_special(c) {
            out.push_str(mapped);
            continue;
        }
        for d in std::iter::once(c).nfkd() {
            if is_combining_mark(d) {
                continue;
            }
            if let Some(mapped) = latin_special(d) {
                out.push_str(mapped);
            } else if is_word_char(d) || d == ' ' {
                out.push(d);
            }
        }
    }
    out
}

fn latin_special(c: char) -> Option<&'static str> {
    let mapped = match c {
        'ß' => "ss",
        'ẞ' => "SS",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ø' => "o",
        'Ø' => "O",
        'ł' => "l",
        'Ł' => "L",
        'đ' => "d",
        'Đ' => "D",
        'ð' => "d",
        'Ð' => "D",
        'þ' => "th",
        'Þ' => "TH",
        'ı' => "i",
        'ħ' => "h",
        'Ħ' => "H",
        _ => return None,
    };
    Some(mapped)
}
