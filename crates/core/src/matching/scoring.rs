//! Confidence aggregation for item/candidate pairs

use crate::domain::item::CartItem;
use crate::domain::matching::{ComponentScores, ConfidenceScore};
use crate::domain::product::CandidateProduct;

use super::comparators::{availability_score, brand_match, category_match, size_match};
use super::normalize::normalize;
use super::similarity::name_similarity;
use super::taxonomy::infer_category;

/// Weights for scoring components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Weight for name similarity (default: 0.40)
    pub name: f64,
    /// Weight for brand match (default: 0.25)
    pub brand: f64,
    /// Weight for category match (default: 0.20)
    pub category: f64,
    /// Weight for size match (default: 0.10)
    pub size: f64,
    /// Weight for availability (default: 0.05)
    pub availability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

/// Score calculator for item/candidate pairs
#[derive(Debug, Clone)]
pub struct ConfidenceCalculator {
    weights: ScoringWeights,
}

impl ConfidenceCalculator {
    /// Create a new calculator with default weights
    pub fn new() -> Self {
        Self { weights: ScoringWeights::default() }
    }

    /// Run every comparator for one pair. Missing fields score zero; an item
    /// without a category borrows one from the grocery taxonomy.
    pub fn component_scores(
        &self,
        item: &CartItem,
        candidate: &CandidateProduct,
    ) -> ComponentScores {
        let item_name = normalize(&item.raw_name);
        let candidate_name = normalize(&candidate.name);
        let item_category = item.category.as_deref().or_else(|| infer_category(&item_name));

        ComponentScores {
            name: name_similarity(&item_name, &candidate_name),
            brand: brand_match(item.brand.as_deref(), candidate.brand.as_deref()),
            category: category_match(item_category, candidate.category.as_deref()),
            size: size_match(item.size.as_deref(), candidate.size.as_deref()),
            availability: availability_score(candidate),
        }
    }

    /// Weighted sum of the components, clamped to `[0, 1]`
    pub fn total(&self, components: &ComponentScores) -> ConfidenceScore {
        let total = components.name * self.weights.name
            + components.brand * self.weights.brand
            + components.category * self.weights.category
            + components.size * self.weights.size
            + components.availability * self.weights.availability;

        ConfidenceScore::new(total)
    }

    pub fn confidence(&self, item: &CartItem, candidate: &CandidateProduct) -> ConfidenceScore {
        self.total(&self.component_scores(item, candidate))
    }
}

impl Default for ConfidenceCalculator {
    fn default() -> Self {
        Self::new()
    }
}
