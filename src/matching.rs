//! Fuzzy product-name matching.
//!
//! Retailers rarely list the same product under a character-identical
//! name ("350ml" vs "350mL", reordered descriptors, extra brand words),
//! so candidates are ranked by a composite similarity score that combines
//! whole-string, best-substring, token-sort and token-set heuristics into
//! one 0-100 measure. The exact blend is not load-bearing; anything that
//! is resilient to word order and partial differences satisfies callers.

use std::collections::BTreeSet;

use tracing::debug;

use crate::model::Candidate;

/// Composite similarity between a query and a candidate name, in [0, 100].
pub fn similarity(query: &str, name: &str) -> f64 {
    let a = normalize(query);
    let b = normalize(name);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }

    let full = strsim::normalized_levenshtein(&a, &b) * 100.0;
    let partial = partial_ratio(&a, &b) * 0.9;
    let sort = token_sort_ratio(&a, &b) * 0.95;
    let set = token_set_ratio(&a, &b) * 0.95;

    full.max(partial).max(sort).max(set).clamp(0.0, 100.0)
}

/// Select the highest-scoring candidate at or above `threshold`.
///
/// Ties keep the first-seen candidate. An empty list or a below-threshold
/// maximum is a legitimate "no match", not an error.
pub fn select_best<'a>(
    query: &str,
    candidates: &'a [Candidate],
    threshold: f64,
) -> Option<&'a Candidate> {
    if candidates.is_empty() {
        return None;
    }

    let mut best: Option<(&Candidate, f64)> = None;
    for candidate in candidates {
        let score = similarity(query, &candidate.name);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    let (candidate, score) = best?;
    if score >= threshold {
        debug!(query, matched = %candidate.name, score, "candidate cleared threshold");
        Some(candidate)
    } else {
        debug!(query, score, threshold, "best candidate below threshold");
        None
    }
}

/// Lowercase and collapse runs of whitespace.
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best alignment of the shorter string against any equal-length window
/// of the longer one.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_chars: Vec<char> = short.chars().collect();
    let long_chars: Vec<char> = long.chars().collect();
    if short_chars.is_empty() {
        return 0.0;
    }
    if short_chars.len() == long_chars.len() {
        return strsim::normalized_levenshtein(short, long) * 100.0;
    }

    let mut best = 0.0_f64;
    for start in 0..=(long_chars.len() - short_chars.len()) {
        let window: String = long_chars[start..start + short_chars.len()].iter().collect();
        let score = strsim::normalized_levenshtein(short, &window) * 100.0;
        if score > best {
            best = score;
        }
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Similarity after sorting tokens, neutralizing word order.
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b)) * 100.0
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Set-based comparison: shared tokens against each side's extras, so a
/// name with additional descriptors still scores high.
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    let common: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    let only_a: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let only_b: Vec<&str> = set_b.difference(&set_a).copied().collect();

    let base = common.join(" ");
    let combined_a = join_parts(&base, &only_a.join(" "));
    let combined_b = join_parts(&base, &only_b.join(" "));

    let pairs = [
        (&base, &combined_a),
        (&base, &combined_b),
        (&combined_a, &combined_b),
    ];
    pairs
        .iter()
        .map(|(x, y)| strsim::normalized_levenshtein(x.as_str(), y.as_str()) * 100.0)
        .fold(0.0, f64::max)
}

fn join_parts(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{} {}", base, rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            price: "$1.00".to_string(),
            url: format!("https://example.com/{}", name.replace(' ', "-")),
        }
    }

    #[test]
    fn empty_candidate_list_is_no_match() {
        assert!(select_best("Palmolive Shampoo", &[], 0.0).is_none());
    }

    #[test]
    fn identical_name_wins_at_any_threshold() {
        let candidates = vec![
            candidate("Whiskas Jellymeat 400g"),
            candidate("Palmolive Naturals Shampoo 350ml"),
        ];
        for threshold in [0.0, 50.0, 100.0] {
            let best = select_best("Palmolive Naturals Shampoo 350ml", &candidates, threshold)
                .expect("exact match must be selected");
            assert_eq!(best.name, "Palmolive Naturals Shampoo 350ml");
        }
    }

    #[test]
    fn case_and_unit_casing_differences_still_match() {
        let candidates = vec![candidate("Palmolive Naturals Shampoo 350mL")];
        let best = select_best("Palmolive Naturals Shampoo 350ml", &candidates, 70.0);
        assert!(best.is_some());
    }

    #[test]
    fn reordered_words_score_high() {
        let score = similarity(
            "Palmolive Naturals Shampoo 350ml",
            "Shampoo Palmolive Naturals 350ml",
        );
        assert!(score > 90.0, "token sort should neutralize order, got {score}");
    }

    #[test]
    fn extra_descriptors_score_above_threshold() {
        let score = similarity(
            "Quilton Aloe Vera Tissue 95pk",
            "Quilton 3 Ply Aloe Vera Facial Tissue 95pk",
        );
        assert!(score >= 70.0, "token set should absorb extras, got {score}");
    }

    #[test]
    fn unrelated_products_stay_below_threshold() {
        let score = similarity(
            "Palmolive Naturals Shampoo 350ml",
            "Whiskas Jellymeat 400g",
        );
        assert!(score < 70.0, "unrelated names scored {score}");
    }

    #[test]
    fn weak_maximum_is_rejected() {
        let candidates = vec![
            candidate("Whiskas Jellymeat 400g"),
            candidate("Twisties Party Bag Cheese 270g"),
        ];
        assert!(select_best("Palmolive Naturals Shampoo 350ml", &candidates, 70.0).is_none());
    }

    #[test]
    fn ties_keep_first_seen_candidate() {
        let candidates = vec![candidate("Jif Surface Cleaner"), candidate("Jif Surface Cleaner")];
        let best = select_best("Jif Surface Cleaner", &candidates, 50.0).unwrap();
        assert!(std::ptr::eq(best, &candidates[0]));
    }

    #[test]
    fn blank_inputs_score_zero() {
        assert_eq!(similarity("", "Palmolive"), 0.0);
        assert_eq!(similarity("Palmolive", "   "), 0.0);
    }
}
