//! Field comparators producing `[0, 1]` sub-scores

use crate::domain::product::{Availability, CandidateProduct};

use super::normalize::normalize;
use super::similarity::name_similarity;

pub fn brand_match(a: Option<&str>, b: Option<&str>) -> f64 {
    exact_field_match(a, b)
}

pub fn category_match(a: Option<&str>, b: Option<&str>) -> f64 {
    exact_field_match(a, b)
}

fn exact_field_match(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a.trim().to_lowercase() == b.trim().to_lowercase() => 1.0,
        _ => 0.0,
    }
}

/// Compares sizes by their leading quantities when both carry one, falling back
/// to name similarity of the size strings otherwise. Units are not converted.
pub fn size_match(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };

    match (first_number(a), first_number(b)) {
        (Some(left), Some(right)) => {
            let largest = left.max(right);
            if largest == 0.0 {
                return 1.0;
            }
            (1.0 - (left - right).abs() / largest).max(0.0)
        }
        _ => name_similarity(&normalize(a), &normalize(b)),
    }
}

/// First decimal number embedded in `text` (`"1.5 lb"` -> 1.5, `"16oz"` -> 16).
pub fn first_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;

    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    text[start..end].parse().ok()
}

pub fn availability_score(candidate: &CandidateProduct) -> f64 {
    match candidate.availability {
        Availability::InStock => 1.0,
        Availability::LowStock => 0.5,
        Availability::OutOfStock | Availability::Unknown => 0.0,
    }
}
