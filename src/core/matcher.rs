//! Best-match selection against a pool of target names.

use crate::core::normalize::normalize;
use crate::core::score::{Metric, Score};
use serde::Serialize;

/// Outcome of a best-match search. `target` is `None` when the pool was
/// empty or nothing cleared the cutoff, in which case `score` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub target: Option<String>,
    pub score: Score,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            target: None,
            score: 0,
        }
    }
}

/// Find the highest scoring candidate for `query`.
///
/// Ties keep the first candidate seen. With `normalize_names` both sides go
/// through [`normalize`] before scoring, but the candidate is returned as
/// given.
pub fn best_match<I, S>(
    query: &str,
    candidates: I,
    metric: Metric,
    cutoff: Score,
    normalize_names: bool,
) -> MatchResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let query = if normalize_names {
        normalize(query)
    } else {
        query.to_string()
    };

    let mut best: Option<(S, Score)> = None;
    for candidate in candidates {
        let score = if normalize_names {
            metric.score(&query, &normalize(candidate.as_ref()))
        } else {
            metric.score(&query, candidate.as_ref())
        };
        if best.as_ref().is_none_or(|(_, s)| score > *s) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) if score >= cutoff => MatchResult {
            target: Some(candidate.as_ref().to_string()),
            score,
        },
        _ => MatchResult::none(),
    }
}

/// Every candidate scoring at least `cutoff`, best first. Equal scores keep
/// input order.
pub fn all_matches<'a>(
    query: &str,
    candidates: &'a [String],
    metric: Metric,
    cutoff: Score,
) -> Vec<(&'a str, Score)> {
    let mut hits: Vec<(&str, Score)> = candidates
        .iter()
        .map(|c| (c.as_str(), metric.score(query, c)))
        .filter(|(_, score)| *score >= cutoff)
        .collect();
    hits.sort_by(|a, b| b.1.cmp(&a.1));
    hits
}
