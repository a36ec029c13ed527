//! Fuzzy similarity metrics.
//!
//! Every metric returns an integer score in `0..=100` and is total over its
//! input: empty or fully-stripped strings score 0 instead of failing. All of
//! them run over the [`default_process`] form of their inputs.

use rapidfuzz::distance::indel;
use serde::{Deserialize, Serialize};

/// Similarity score in `0..=100`.
pub type Score = u8;

/// The metric a match is scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Ratio,
    TokenSort,
    TokenSet,
    Partial,
    PartialTokenSort,
}

impl Metric {
    pub fn score(self, a: &str, b: &str) -> Score {
        match self {
            Metric::Ratio => ratio(a, b),
            Metric::TokenSort => token_sort_ratio(a, b),
            Metric::TokenSet => token_set_ratio(a, b),
            Metric::Partial => partial_ratio(a, b),
            Metric::PartialTokenSort => partial_token_sort_ratio(a, b),
        }
    }
}

/// Lowercase, turn every non-alphanumeric character into a space, trim.
pub fn default_process(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Plain indel similarity of the processed strings.
pub fn ratio(a: &str, b: &str) -> Score {
    let a: Vec<char> = default_process(a).chars().collect();
    let b: Vec<char> = default_process(b).chars().collect();
    to_score(indel_similarity(&a, &b))
}

/// Ratio of the whitespace tokens after sorting, so word order is ignored.
pub fn token_sort_ratio(a: &str, b: &str) -> Score {
    let a: Vec<char> = sorted_tokens(a).chars().collect();
    let b: Vec<char> = sorted_tokens(b).chars().collect();
    to_score(indel_similarity(&a, &b))
}

/// Token-set comparison: shared tokens count fully, so a name that is a
/// token subset of the other scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> Score {
    let a = token_set(a);
    let b = token_set(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let sect: Vec<&str> = a.iter().filter(|t| b.contains(t)).map(String::as_str).collect();
    let diff_ab: Vec<&str> = a.iter().filter(|t| !b.contains(t)).map(String::as_str).collect();
    let diff_ba: Vec<&str> = b.iter().filter(|t| !a.contains(t)).map(String::as_str).collect();

    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100;
    }

    let t0 = sect.join(" ");
    let t1 = join_nonempty(&t0, &diff_ab.join(" "));
    let t2 = join_nonempty(&t0, &diff_ba.join(" "));

    let t0: Vec<char> = t0.chars().collect();
    let t1: Vec<char> = t1.chars().collect();
    let t2: Vec<char> = t2.chars().collect();

    let best = indel_similarity(&t0, &t1)
        .max(indel_similarity(&t0, &t2))
        .max(indel_similarity(&t1, &t2));
    to_score(best)
}

/// Best alignment of the shorter string inside the longer one.
pub fn partial_ratio(a: &str, b: &str) -> Score {
    let a: Vec<char> = default_process(a).chars().collect();
    let b: Vec<char> = default_process(b).chars().collect();
    to_score(partial_similarity(&a, &b))
}

/// [`partial_ratio`] over token-sorted strings.
pub fn partial_token_sort_ratio(a: &str, b: &str) -> Score {
    let a: Vec<char> = sorted_tokens(a).chars().collect();
    let b: Vec<char> = sorted_tokens(b).chars().collect();
    to_score(partial_similarity(&a, &b))
}

fn sorted_tokens(s: &str) -> String {
    let processed = default_process(s);
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Unique tokens in sorted order.
fn token_set(s: &str) -> Vec<String> {
    let mut tokens: Vec<String> = default_process(s)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

fn to_score(similarity: f64) -> Score {
    (similarity * 100.0).round().clamp(0.0, 100.0) as Score
}

/// `2 * LCS / (len_a + len_b)`, 0 when either side is empty. The indel
/// distance is `len_a + len_b - 2 * LCS`.
fn indel_similarity(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let total = a.len() + b.len();
    let distance = indel::distance(a.iter().copied(), b.iter().copied());
    (total - distance) as f64 / total as f64
}

fn partial_similarity(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }

    let m = short.len();
    let n = long.len();
    let mut best = 0.0f64;

    // Edge windows hanging off the start and end of the longer string.
    for k in 1..m.min(n) {
        best = best
            .max(indel_similarity(short, &long[..k]))
            .max(indel_similarity(short, &long[n - k..]));
    }
    for start in 0..=(n - m) {
        best = best.max(indel_similarity(short, &long[start..start + m]));
        if best >= 0.995 {
            return 1.0;
        }
    }
    best
}
