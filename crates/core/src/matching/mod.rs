//! Product matching and confidence scoring
//!
//! Turns a free-text cart item and a list of candidate products into a ranked
//! `MatchResult`: names are normalized, compared field by field, folded into a
//! weighted confidence and classified into a tier.

mod comparators;
mod normalize;
mod ranker;
mod scoring;
mod similarity;
mod taxonomy;

pub use comparators::{availability_score, brand_match, category_match, first_number, size_match};
pub use normalize::{normalize, tokens};
pub use ranker::{CandidateRanker, RankOptions};
pub use scoring::{ConfidenceCalculator, ScoringWeights};
pub use similarity::name_similarity;
pub use taxonomy::infer_category;

/// Default scoring weights
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    name: 0.40,
    brand: 0.25,
    category: 0.20,
    size: 0.10,
    availability: 0.05,
};

/// Alternatives returned next to the best match unless configured otherwise
pub const DEFAULT_MAX_ALTERNATIVES: usize = 3;

/// Reasons attached to a single alternative
pub const MAX_MATCH_REASONS: usize = 3;
