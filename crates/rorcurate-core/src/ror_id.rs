//! ROR identifier classification and affiliation string normalisation.
//!
//! A ROR id is `0` followed by six Crockford base32 characters and a
//! two-character checksum, e.g. `02feahw73`. Search input mixes ROR ids
//! (bare or as `https://ror.org/...` links) with free-text affiliation
//! strings, so both go through the same normalisation before being
//! classified or used as a grouping key.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Crockford base32 without `i`, `l`, `o`, `u`.
static ROR_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^0[0-9a-hjkmnp-tv-z]{6}[0-9a-hjkmnp-tv-z]{2}$").expect("valid ROR pattern")
});

const ROR_PREFIXES: &[&str] = &["https://ror.org/", "http://ror.org/", "ror.org/"];

/// Strip diacritics while keeping case and spacing.
///
/// `"Université"` → `"Universite"`.
pub fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalise a free-text affiliation string into its working key.
///
/// Strips diacritics, lowercases and collapses whitespace, so
/// `"Université  Paris"`, `"universite paris"` and `"UNIVERSITE PARIS"`
/// all map to `"universite paris"`.
pub fn normalize(s: &str) -> String {
    strip_diacritics(s)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical ROR id for `token`, or `None` if it is not shaped like one.
///
/// Accepts bare ids and `ror.org` links in any case.
pub fn clean_ror(token: &str) -> Option<String> {
    let normalized = normalize(token);
    let bare = ROR_PREFIXES
        .iter()
        .find_map(|prefix| normalized.strip_prefix(prefix))
        .unwrap_or(&normalized);
    ROR_SHAPE.is_match(bare).then(|| bare.to_string())
}

/// Format check only; says nothing about whether the registry knows the id.
pub fn is_ror(token: &str) -> bool {
    clean_ror(token).is_some()
}
