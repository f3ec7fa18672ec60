use cartmatch_core::domain::matching::{ConfidenceTier, ValidationFlag};
use cartmatch_core::matching::{name_similarity, normalize, CandidateRanker, RankOptions};
use cartmatch_core::{Availability, CandidateProduct, CartItem};

type ScenarioResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

const NAMES: &[&str] = &[
    "Organic Whole Milk",
    "  2% reduced-fat MILK ",
    "Ben & Jerry's Cherry Garcia",
    "Eggs, large (12 ct)",
    "bananas",
    "",
    "   ",
    "Häagen-Dazs Vanilla",
    "1 gal",
    "whole wheat bread 24oz",
];

#[test]
fn normalized_name_is_always_identical_to_itself() -> ScenarioResult {
    for name in NAMES {
        let normalized = normalize(name);
        let score = name_similarity(&normalized, &normalized);
        require!(score == 1.0, "self-similarity of {name:?} was {score}");
    }
    Ok(())
}

#[test]
fn name_similarity_is_symmetric() -> ScenarioResult {
    for left in NAMES {
        for right in NAMES {
            let (left, right) = (normalize(left), normalize(right));
            let forward = name_similarity(&left, &right);
            let backward = name_similarity(&right, &left);
            require!(
                (forward - backward).abs() < 1e-9,
                "similarity of {left:?} and {right:?} is asymmetric: {forward} vs {backward}"
            );
            require!((0.0..=1.0).contains(&forward), "similarity {forward} out of range");
        }
    }
    Ok(())
}

#[test]
fn branded_milk_is_an_excellent_match() -> ScenarioResult {
    let item = CartItem::new("milk", "Organic Whole Milk").with_brand("Horizon");
    let candidate = CandidateProduct::new("hz-1", "Organic Whole Milk")
        .with_brand("Horizon")
        .with_category("dairy")
        .with_availability(Availability::InStock);

    let result = CandidateRanker::default().rank(&item, vec![candidate], &RankOptions::default());

    require!(result.confidence.value() >= 0.8, "confidence was {}", result.confidence);
    require_eq!(result.tier, ConfidenceTier::Excellent);
    let best_id = result.best_match.as_ref().map(|product| product.id.as_str());
    require_eq!(best_id, Some("hz-1"));
    require!(result.has_flag(ValidationFlag::HighConfidence));
    Ok(())
}

#[test]
fn unknown_item_without_candidates_is_poor_but_not_failed() -> ScenarioResult {
    let item = CartItem::new("x", "Xyzzy Nonexistent Item");

    let result = CandidateRanker::default().rank(&item, Vec::new(), &RankOptions::default());

    require!(result.best_match.is_none());
    require_eq!(result.confidence.value(), 0.0);
    require_eq!(result.tier, ConfidenceTier::Poor);
    require!(!result.has_flag(ValidationFlag::ValidationFailed));
    require!(result.alternatives.is_empty());
    Ok(())
}

#[test]
fn alternatives_respect_the_requested_limit() -> ScenarioResult {
    let item = CartItem::new("m", "Milk");
    let candidates =
        vec![CandidateProduct::new("milk-a", "Milk"), CandidateProduct::new("milk-b", "Milk")];
    let options = RankOptions { max_alternatives: 1, ..RankOptions::default() };

    let result = CandidateRanker::default().rank(&item, candidates, &options);

    require_eq!(result.alternatives.len(), 1);
    let best_id = result.best_match.as_ref().map(|product| product.id.clone());
    require!(
        result.alternatives.iter().all(|alt| Some(&alt.product.id) != best_id.as_ref()),
        "alternatives must never repeat the best match"
    );
    Ok(())
}

#[test]
fn duplicate_candidates_never_leak_the_best_match_into_alternatives() -> ScenarioResult {
    let item = CartItem::new("b", "Bread");
    let bread = CandidateProduct::new("bread-1", "Bread").with_category("bakery");
    let candidates = vec![
        bread.clone(),
        bread,
        CandidateProduct::new("bread-2", "Bread Rolls"),
        CandidateProduct::new("bread-3", "Bread Crumbs"),
        CandidateProduct::new("bread-4", "Breadsticks"),
        CandidateProduct::new("bread-5", "Sourdough Bread"),
    ];

    let result = CandidateRanker::default().rank(&item, candidates, &RankOptions::default());

    require_eq!(result.best_match.as_ref().map(|product| product.id.as_str()), Some("bread-1"));
    require!(result.alternatives.len() <= 3);
    require!(result.alternatives.iter().all(|alt| alt.product.id.as_str() != "bread-1"));
    Ok(())
}
