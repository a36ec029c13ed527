//! Name canonicalization for fuzzy comparison.

use regex::Regex;
use std::sync::LazyLock;

/// A parenthesized four digit year, e.g. `(1999)`.
static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([0-9]{4}\)").expect("Invalid regex"));

/// A trailing `set by <creator>` suffix, case-insensitive.
static RE_SET_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+set by.*$").expect("Invalid regex"));

/// Canonicalize a display name for comparison.
///
/// Steps, each applied to the previous output:
/// 1. strip the last `.ext` segment
/// 2. drop any `(YYYY)` year token
/// 3. drop a trailing `set by ...` suffix and trim
/// 4. remove ASCII punctuation (inner whitespace is kept as-is)
/// 5. lowercase
///
/// The pass is repeated until the output is stable, so the result is always
/// a fixed point: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(name: &str) -> String {
    let mut current = normalize_once(name);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(name: &str) -> String {
    let stem = strip_extension(name);
    let without_year = RE_YEAR.replace_all(stem, "");
    let without_credit = RE_SET_BY.replace(&without_year, "");
    without_credit
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase()
}

/// Remove the last `.ext` segment. Leading dots (hidden files) are not an
/// extension.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => &name[..idx],
        _ => name,
    }
}

/// The `.ext` segment removed by [`strip_extension`], dot included, or `""`.
pub fn extension(name: &str) -> &str {
    &name[strip_extension(name).len()..]
}

/// File stem with surrounding whitespace trimmed; the form used when an asset
/// is renamed after itself.
pub fn display_stem(name: &str) -> String {
    strip_extension(name).trim().to_string()
}
