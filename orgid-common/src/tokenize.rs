//! Query tokenization
//!
//! Splits a free-text affiliation string into fragments that each should
//! name a single institution. Output order is acronyms, then parenthetical
//! contents, then the delimiter-split remainder; it does not follow the
//! left-to-right order of the source text. Repeated tokens are kept.

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum token length in characters
pub const MIN_TOKEN_LEN: usize = 3;

static ACRONYM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").expect("acronym pattern is valid"));

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("parenthetical pattern is valid"));

const DELIMITERS: &[char] = &[',', ';', '–', '—', '-'];

/// Split a raw query into candidate name fragments.
///
/// Every returned token is at least [`MIN_TOKEN_LEN`] characters long.
///
/// # Examples
/// ```
/// use orgid_common::tokenize::tokenize;
///
/// assert_eq!(tokenize("NASA Ames Research Center"), vec!["NASA", "Ames Research Center"]);
/// assert_eq!(tokenize("Example University (EU)"), vec!["Example University"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut remaining = text.to_string();

    // Acronyms: every occurrence of the acronym text is blanked, not just the
    // matched span, so an acronym that recurs inside a longer word is erased there too.
    let acronyms: Vec<String> = ACRONYM_RE
        .find_iter(&remaining)
        .map(|m| m.as_str().to_string())
        .collect();
    for acronym in acronyms {
        if char_len(&acronym) >= MIN_TOKEN_LEN {
            remaining = remaining.replace(&acronym, " ");
            tokens.push(acronym);
        }
    }

    // Parentheticals: short contents are dropped but still cut out of the text
    let groups: Vec<String> = PARENTHETICAL_RE
        .captures_iter(&remaining)
        .filter_map(|caps| caps.get(1).map(|inner| inner.as_str().to_string()))
        .collect();
    for inner in groups {
        remaining = remaining.replace(&format!("({})", inner), " ");
        if char_len(&inner) >= MIN_TOKEN_LEN {
            tokens.push(inner);
        }
    }

    tokens.extend(
        remaining
            .split(DELIMITERS)
            .map(str::trim)
            .filter(|part| char_len(part) >= MIN_TOKEN_LEN)
            .map(str::to_string),
    );

    tokens.retain(|token| char_len(token) >= MIN_TOKEN_LEN);
    tokens
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acronym_then_remainder() {
        assert_eq!(
            tokenize("NASA Ames Research Center"),
            vec!["NASA", "Ames Research Center"]
        );
    }

    #[test]
    fn test_short_parenthetical_is_excised() {
        assert_eq!(tokenize("Example University (EU)"), vec!["Example University"]);
    }

    #[test]
    fn test_parenthetical_content_becomes_token() {
        assert_eq!(
            tokenize("Universidade de São Paulo (Escola Politécnica), Brazil"),
            vec!["Escola Politécnica", "Universidade de São Paulo", "Brazil"]
        );
    }

    #[test]
    fn test_acronym_inside_parentheses_extracted_first() {
        // "USP" is blanked before the parenthetical pass; the leftover "( )" is cut too
        assert_eq!(
            tokenize("Universidade de São Paulo (USP)"),
            vec!["USP", "Universidade de São Paulo"]
        );
    }

    #[test]
    fn test_two_letter_acronym_not_extracted() {
        assert_eq!(tokenize("UK Biobank, Stockport"), vec!["UK Biobank", "Stockport"]);
    }

    #[test]
    fn test_splits_on_all_delimiters() {
        assert_eq!(
            tokenize("Dept of Physics; Harvard University – Cambridge — Massachusetts-USA"),
            vec![
                "USA",
                "Dept of Physics",
                "Harvard University",
                "Cambridge",
                "Massachusetts"
            ]
        );
    }

    #[test]
    fn test_drops_short_pieces() {
        assert_eq!(tokenize("Oxford, UK, a, ab"), vec!["Oxford"]);
    }

    #[test]
    fn test_repeated_acronym_kept_twice() {
        assert_eq!(tokenize("CERN and CERN"), vec!["CERN", "CERN", "and"]);
    }

    #[test]
    fn test_acronym_removed_from_inside_other_words() {
        // substring removal is case-sensitive
        assert_eq!(tokenize("MIT Smith Lab"), vec!["MIT", "Smith Lab"]);
        // An uppercase substring elsewhere is erased along with the acronym
        assert_eq!(tokenize("MIT, MITx Lab"), vec!["MIT", "x Lab"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" , ; - ").is_empty());
    }

    #[test]
    fn test_every_token_meets_minimum_length() {
        let samples = [
            "MIT Center for X, Cambridge",
            "a (bc) de, f; GH - IJK",
            "Lab (X) (YZ) (ABCD)",
        ];
        for s in samples {
            for token in tokenize(s) {
                assert!(char_len(&token) >= MIN_TOKEN_LEN, "{:?} from {:?}", token, s);
            }
        }
    }
}
