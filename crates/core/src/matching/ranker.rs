//! Candidate ranking: best match, alternatives, flags and recommended actions

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use crate::domain::item::CartItem;
use crate::domain::matching::{
    Alternative, ComponentScores, ConfidenceScore, ConfidenceTier, MatchResult,
    RecommendedAction, ValidationFlag,
};
use crate::domain::product::{Availability, CandidateProduct};

use super::scoring::ConfidenceCalculator;
use super::{DEFAULT_MAX_ALTERNATIVES, MAX_MATCH_REASONS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    pub include_alternatives: bool,
    /// Floor the top candidate must reach to become the best match
    pub min_confidence: f64,
    pub max_alternatives: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            include_alternatives: true,
            min_confidence: 0.0,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        }
    }
}

#[derive(Debug, Clone)]
struct ScoredCandidate {
    product: CandidateProduct,
    components: ComponentScores,
    confidence: ConfidenceScore,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateRanker {
    calculator: ConfidenceCalculator,
}

impl CandidateRanker {
    pub fn new(calculator: ConfidenceCalculator) -> Self {
        Self { calculator }
    }

    pub fn rank(
        &self,
        item: &CartItem,
        candidates: Vec<CandidateProduct>,
        options: &RankOptions,
    ) -> MatchResult {
        let mut result = MatchResult::unmatched(item.clone());

        if candidates.is_empty() {
            result.flags.insert(ValidationFlag::NoCandidates);
            result.flags.insert(ValidationFlag::LowConfidence);
            result.recommended_actions = recommended_actions(result.tier, false, false);
            return result;
        }

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|product| {
                let components = self.calculator.component_scores(item, &product);
                let confidence = self.calculator.total(&components);
                ScoredCandidate { product, components, confidence }
            })
            .collect();

        // Stable sort keeps provider order for equal scores.
        scored.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

        let floor_met = scored[0].confidence.value() >= options.min_confidence;
        let mut ranked = scored.into_iter();
        let best = if floor_met {
            ranked.next()
        } else {
            result.flags.insert(ValidationFlag::BelowConfidenceFloor);
            None
        };

        let best_id = best.as_ref().map(|best| best.product.id.clone());
        if options.include_alternatives {
            let mut seen = HashSet::new();
            result.alternatives = ranked
                .filter(|candidate| Some(&candidate.product.id) != best_id.as_ref())
                .filter(|candidate| seen.insert(candidate.product.id.clone()))
                .take(options.max_alternatives)
                .map(|candidate| Alternative {
                    reasons: match_reasons(&candidate),
                    tier: candidate.confidence.tier(),
                    confidence: candidate.confidence,
                    product: candidate.product,
                })
                .collect();
        }

        let mut out_of_stock = false;
        if let Some(best) = best {
            result.confidence = best.confidence;
            result.tier = best.confidence.tier();
            result.components = Some(best.components);
            out_of_stock = best.product.availability == Availability::OutOfStock;
            result.flags.extend(completeness_flags(&best.product));
            result.best_match = Some(best.product);
        }

        result.flags.extend(tier_flags(result.tier));
        result.recommended_actions =
            recommended_actions(result.tier, out_of_stock, !result.alternatives.is_empty());
        result
    }
}

fn completeness_flags(product: &CandidateProduct) -> BTreeSet<ValidationFlag> {
    let mut flags = BTreeSet::new();
    if product.price.is_none() {
        flags.insert(ValidationFlag::MissingPrice);
    }
    if product.brand.is_none() {
        flags.insert(ValidationFlag::MissingBrand);
    }
    if product.category.is_none() {
        flags.insert(ValidationFlag::MissingCategory);
    }
    if product.availability == Availability::OutOfStock {
        flags.insert(ValidationFlag::OutOfStock);
    }
    flags
}

fn tier_flags(tier: ConfidenceTier) -> BTreeSet<ValidationFlag> {
    let mut flags = BTreeSet::new();
    if tier <= ConfidenceTier::Fair {
        flags.insert(ValidationFlag::LowConfidence);
    }
    if tier == ConfidenceTier::Excellent {
        flags.insert(ValidationFlag::HighConfidence);
    }
    flags
}

fn recommended_actions(
    tier: ConfidenceTier,
    best_out_of_stock: bool,
    has_alternatives: bool,
) -> BTreeSet<RecommendedAction> {
    let mut actions = BTreeSet::new();

    match tier {
        ConfidenceTier::Excellent | ConfidenceTier::Good => {
            actions.insert(RecommendedAction::ReadyForCheckout);
        }
        ConfidenceTier::Fair => {
            actions.insert(RecommendedAction::VerifyMatch);
        }
        ConfidenceTier::Poor => {
            actions.insert(RecommendedAction::ManualReviewRecommended);
        }
    }

    if has_alternatives && (tier <= ConfidenceTier::Fair || best_out_of_stock) {
        actions.insert(RecommendedAction::ConsiderAlternatives);
    }

    actions
}

fn match_reasons(candidate: &ScoredCandidate) -> Vec<String> {
    let product = &candidate.product;
    let components = &candidate.components;
    let mut reasons = Vec::new();

    if let (Some(brand), true) = (&product.brand, components.brand >= 1.0) {
        reasons.push(format!("Same brand: {brand}"));
    }
    if let (Some(category), true) = (&product.category, components.category >= 1.0) {
        reasons.push(format!("Same category: {category}"));
    }
    if let (Some(size), true) = (&product.size, components.size >= 0.8) {
        reasons.push(format!("Similar size: {size}"));
    }
    if components.name >= 0.7 {
        reasons.push("Similar name".to_owned());
    } else if components.name > 0.0 {
        reasons.push("Partial name match".to_owned());
    }
    match product.availability {
        Availability::InStock => reasons.push("In stock".to_owned()),
        Availability::LowStock => reasons.push("Limited stock".to_owned()),
        Availability::OutOfStock | Availability::Unknown => {}
    }

    reasons.truncate(MAX_MATCH_REASONS);
    reasons
}
