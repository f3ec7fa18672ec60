//! Engine facade: cart items in, scored matches out.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::SearchCache;
use crate::config::AppConfig;
use crate::domain::item::CartItem;
use crate::domain::matching::{BatchResult, MatchResult};
use crate::matching::{CandidateRanker, RankOptions};
use crate::pricing::PriceAggregator;
use crate::resolver::{BatchCancellation, BatchResolver, ItemResolver, ResolveOptions};
use crate::search::SearchProvider;

/// Per-call knobs for the engine API.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchOptions {
    pub include_alternatives: bool,
    pub min_confidence: f64,
    pub max_alternatives: usize,
    pub include_pricing: bool,
    pub window_size: usize,
    pub pacing_delay_ms: u64,
    /// Only read when the engine builds its own cache
    pub cache_ttl_ms: u64,
    pub max_results: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            include_alternatives: true,
            min_confidence: 0.0,
            max_alternatives: 3,
            include_pricing: false,
            window_size: 3,
            pacing_delay_ms: 500,
            cache_ttl_ms: 900_000,
            max_results: 10,
        }
    }
}

impl From<&AppConfig> for MatchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            include_alternatives: config.matching.include_alternatives,
            min_confidence: config.matching.min_confidence,
            max_alternatives: config.matching.max_alternatives,
            include_pricing: config.pricing.enabled,
            window_size: config.batch.window_size,
            pacing_delay_ms: config.batch.pacing_delay_ms,
            cache_ttl_ms: config.cache.ttl_ms,
            max_results: config.matching.max_results,
        }
    }
}

impl MatchOptions {
    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            rank: RankOptions {
                include_alternatives: self.include_alternatives,
                min_confidence: self.min_confidence,
                max_alternatives: self.max_alternatives,
            },
            max_results: self.max_results,
            include_pricing: self.include_pricing,
        }
    }
}

pub struct MatchingEngine {
    search: Arc<dyn SearchProvider>,
    cache: Arc<SearchCache>,
    pricing: Option<Arc<dyn PriceAggregator>>,
    ranker: CandidateRanker,
    retailer: Option<String>,
}

impl MatchingEngine {
    /// Builds an engine with its own cache, sized by `options.cache_ttl_ms`.
    pub fn new(search: Arc<dyn SearchProvider>, options: &MatchOptions) -> Self {
        let cache = SearchCache::new(Duration::from_millis(options.cache_ttl_ms));
        Self::with_cache(search, Arc::new(cache))
    }

    pub fn with_cache(search: Arc<dyn SearchProvider>, cache: Arc<SearchCache>) -> Self {
        Self { search, cache, pricing: None, ranker: CandidateRanker::default(), retailer: None }
    }

    pub fn with_pricing(mut self, pricing: Arc<dyn PriceAggregator>) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_retailer(mut self, retailer: impl Into<String>) -> Self {
        self.retailer = Some(retailer.into());
        self
    }

    pub fn with_ranker(mut self, ranker: CandidateRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    pub async fn validate_cart_items(
        &self,
        items: Vec<CartItem>,
        options: &MatchOptions,
    ) -> BatchResult {
        self.validate_cart_items_with(items, options, &BatchCancellation::new()).await
    }

    pub async fn validate_cart_items_with(
        &self,
        items: Vec<CartItem>,
        options: &MatchOptions,
        cancellation: &BatchCancellation,
    ) -> BatchResult {
        BatchResolver::new(self.item_resolver(options))
            .with_window_size(options.window_size)
            .with_pacing_delay(Duration::from_millis(options.pacing_delay_ms))
            .resolve_batch_with(items, cancellation)
            .await
    }

    pub async fn validate_single_item(
        &self,
        item: CartItem,
        options: &MatchOptions,
    ) -> MatchResult {
        self.item_resolver(options).resolve(item).await
    }

    fn item_resolver(&self, options: &MatchOptions) -> ItemResolver {
        let mut resolver = ItemResolver::new(Arc::clone(&self.search), Arc::clone(&self.cache))
            .with_ranker(self.ranker.clone())
            .with_options(options.resolve_options());
        if let Some(pricing) = &self.pricing {
            resolver = resolver.with_pricing(Arc::clone(pricing));
        }
        if let Some(retailer) = &self.retailer {
            resolver = resolver.with_retailer(retailer.clone());
        }
        resolver
    }
}
