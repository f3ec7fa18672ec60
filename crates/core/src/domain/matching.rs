use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::item::CartItem;
use crate::domain::product::CandidateProduct;
use crate::pricing::PricingInfo;

/// A confidence value, always inside `[0.0, 1.0]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    pub const ZERO: Self = Self(0.0);

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn tier(self) -> ConfidenceTier {
        ConfidenceTier::from_score(self.0)
    }
}

impl From<f64> for ConfidenceScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<ConfidenceScore> for f64 {
    fn from(value: ConfidenceScore) -> Self {
        value.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0 * 100.0)
    }
}

/// Discretized confidence. Variant order is significant: `Poor < Fair < Good < Excellent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// score < 0.40
    Poor,
    /// 0.40 <= score < 0.60
    Fair,
    /// 0.60 <= score < 0.80
    Good,
    /// score >= 0.80
    Excellent,
}

impl ConfidenceTier {
    pub const EXCELLENT_THRESHOLD: f64 = 0.80;
    pub const GOOD_THRESHOLD: f64 = 0.60;
    pub const FAIR_THRESHOLD: f64 = 0.40;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::EXCELLENT_THRESHOLD {
            ConfidenceTier::Excellent
        } else if score >= Self::GOOD_THRESHOLD {
            ConfidenceTier::Good
        } else if score >= Self::FAIR_THRESHOLD {
            ConfidenceTier::Fair
        } else {
            ConfidenceTier::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceTier::Excellent => "excellent",
            ConfidenceTier::Good => "good",
            ConfidenceTier::Fair => "fair",
            ConfidenceTier::Poor => "poor",
        }
    }
}

/// Individual comparator outputs behind a confidence value
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub name: f64,
    pub brand: f64,
    pub category: f64,
    pub size: f64,
    pub availability: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFlag {
    MissingPrice,
    MissingBrand,
    MissingCategory,
    LowConfidence,
    HighConfidence,
    ValidationFailed,
    NoCandidates,
    OutOfStock,
    BelowConfidenceFloor,
    NotProcessed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ReadyForCheckout,
    VerifyMatch,
    ManualReviewRecommended,
    ConsiderAlternatives,
}

/// A runner-up candidate offered next to the best match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub product: CandidateProduct,
    pub confidence: ConfidenceScore,
    pub tier: ConfidenceTier,
    pub reasons: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub original_item: CartItem,
    pub best_match: Option<CandidateProduct>,
    pub confidence: ConfidenceScore,
    pub tier: ConfidenceTier,
    pub alternatives: Vec<Alternative>,
    pub flags: BTreeSet<ValidationFlag>,
    pub recommended_actions: BTreeSet<RecommendedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentScores>,
}

impl MatchResult {
    /// Zero-confidence result with no candidates attached.
    pub fn unmatched(item: CartItem) -> Self {
        Self {
            original_item: item,
            best_match: None,
            confidence: ConfidenceScore::ZERO,
            tier: ConfidenceTier::Poor,
            alternatives: Vec::new(),
            flags: BTreeSet::new(),
            recommended_actions: BTreeSet::new(),
            pricing: None,
            components: None,
        }
    }

    /// Result for an item whose resolution failed before ranking.
    pub fn failed(item: CartItem) -> Self {
        let mut result = Self::unmatched(item);
        result.flags.insert(ValidationFlag::ValidationFailed);
        result.flags.insert(ValidationFlag::LowConfidence);
        result.recommended_actions.insert(RecommendedAction::ManualReviewRecommended);
        result
    }

    /// Result for an item skipped because the batch was cancelled.
    pub fn not_processed(item: CartItem) -> Self {
        let mut result = Self::unmatched(item);
        result.flags.insert(ValidationFlag::NotProcessed);
        result
    }

    pub fn has_flag(&self, flag: ValidationFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn needs_review(&self) -> bool {
        self.tier < ConfidenceTier::Good
            || self.has_flag(ValidationFlag::ValidationFailed)
            || self.has_flag(ValidationFlag::NotProcessed)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

impl TierCounts {
    fn record(&mut self, tier: ConfidenceTier) {
        match tier {
            ConfidenceTier::Excellent => self.excellent += 1,
            ConfidenceTier::Good => self.good += 1,
            ConfidenceTier::Fair => self.fair += 1,
            ConfidenceTier::Poor => self.poor += 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_items: usize,
    pub matched: usize,
    pub failed: usize,
    pub needs_review: usize,
    pub average_confidence: f64,
    pub tier_counts: TierCounts,
}

impl BatchSummary {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut summary = Self { total_items: results.len(), ..Self::default() };
        let mut confidence_sum = 0.0;

        for result in results {
            summary.tier_counts.record(result.tier);
            confidence_sum += result.confidence.value();
            if result.best_match.is_some() {
                summary.matched += 1;
            }
            if result.has_flag(ValidationFlag::ValidationFailed) {
                summary.failed += 1;
            }
            if result.needs_review() {
                summary.needs_review += 1;
            }
        }

        if !results.is_empty() {
            summary.average_confidence = confidence_sum / results.len() as f64;
        }

        summary
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub results: Vec<MatchResult>,
    pub summary: BatchSummary,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn new(batch_id: Uuid, results: Vec<MatchResult>, cancelled: bool) -> Self {
        let summary = BatchSummary::from_results(&results);
        Self { batch_id, results, summary, cancelled }
    }
}
