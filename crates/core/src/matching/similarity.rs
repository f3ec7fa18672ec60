//! Token-overlap name similarity

use strsim::levenshtein;

use super::normalize::tokens;

const EXACT_TOKEN_POINTS: f64 = 1.0;
const CONTAINMENT_POINTS: f64 = 0.5;
const NEAR_MISS_POINTS: f64 = 0.3;
const MIN_FUZZY_TOKEN_LEN: usize = 3;
const MAX_NEAR_MISS_DISTANCE: usize = 2;

/// Similarity of two normalized names in `[0.0, 1.0]`.
///
/// Every token pair is scored: equal tokens earn 1.0, containment 0.5 and an edit
/// distance of at most two 0.3, the last two only for tokens of three or more
/// characters. The sum is divided by the longer token list and capped at 1.0.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let tokens_a = tokens(a);
    let tokens_b = tokens(b);
    let denominator = tokens_a.len().max(tokens_b.len());
    if denominator == 0 {
        return 0.0;
    }

    let points: f64 = tokens_a
        .iter()
        .flat_map(|left| tokens_b.iter().map(move |right| token_points(left, right)))
        .sum();

    (points / denominator as f64).min(1.0)
}

fn token_points(left: &str, right: &str) -> f64 {
    if left == right {
        return EXACT_TOKEN_POINTS;
    }

    let fuzzy_eligible = left.chars().count() >= MIN_FUZZY_TOKEN_LEN
        && right.chars().count() >= MIN_FUZZY_TOKEN_LEN;
    if !fuzzy_eligible {
        return 0.0;
    }

    if left.contains(right) || right.contains(left) {
        CONTAINMENT_POINTS
    } else if levenshtein(left, right) <= MAX_NEAR_MISS_DISTANCE {
        NEAR_MISS_POINTS
    } else {
        0.0
    }
}
