//! Batch resolution of cart items against the search provider.
//!
//! Items are processed in fixed-size windows. Every item of a window runs as its own
//! tokio task and the window is awaited as a whole. A pacing delay separates windows.
//! A failed or panicked item never affects its siblings, and results always come back
//! in input order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cache::{cache_key, SearchCache};
use crate::domain::item::CartItem;
use crate::domain::matching::{BatchResult, MatchResult};
use crate::domain::product::CandidateProduct;
use crate::errors::MatchError;
use crate::matching::{CandidateRanker, RankOptions};
use crate::pricing::PriceAggregator;
use crate::search::{SearchOptions, SearchProvider, DEFAULT_MAX_RESULTS};

pub const DEFAULT_WINDOW_SIZE: usize = 3;
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(500);

/// Cooperative cancellation for a running batch, checked between windows.
#[derive(Clone, Debug, Default)]
pub struct BatchCancellation {
    cancelled: Arc<AtomicBool>,
}

impl BatchCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolveOptions {
    pub rank: RankOptions,
    pub max_results: usize,
    pub include_pricing: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            rank: RankOptions::default(),
            max_results: DEFAULT_MAX_RESULTS,
            include_pricing: false,
        }
    }
}

/// Resolves one cart item: cache, search on miss, rank, then optional pricing.
#[derive(Clone)]
pub struct ItemResolver {
    search: Arc<dyn SearchProvider>,
    cache: Arc<SearchCache>,
    pricing: Option<Arc<dyn PriceAggregator>>,
    ranker: CandidateRanker,
    retailer: Option<String>,
    options: ResolveOptions,
}

impl ItemResolver {
    pub fn new(search: Arc<dyn SearchProvider>, cache: Arc<SearchCache>) -> Self {
        Self {
            search,
            cache,
            pricing: None,
            ranker: CandidateRanker::default(),
            retailer: None,
            options: ResolveOptions::default(),
        }
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

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn resolve(&self, item: CartItem) -> MatchResult {
        if item.has_blank_name() {
            let error = MatchError::InvalidInput("cart item name is blank".to_owned());
            warn!(
                event_name = "matching.item.rejected",
                item_id = item.id.as_str(),
                error = %error,
                "rejected cart item without searching"
            );
            return MatchResult::failed(item);
        }

        let search_options = SearchOptions {
            category: item.category.clone(),
            brand: item.brand.clone(),
            max_results: self.options.max_results,
            min_confidence: self.options.rank.min_confidence,
        };

        let candidates = match self.candidates(&item.raw_name, &search_options).await {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(
                    event_name = "matching.search.failed",
                    item_id = item.id.as_str(),
                    error = %error,
                    "search failed; item resolved as unmatched"
                );
                return MatchResult::failed(item);
            }
        };

        let mut result = self.ranker.rank(&item, candidates, &self.options.rank);

        if self.options.include_pricing {
            if let Some(pricing) = &self.pricing {
                match pricing.multi_source_pricing(&item, result.best_match.as_ref()).await {
                    Ok(info) => result.pricing = info,
                    Err(error) => {
                        let error = MatchError::PricingUnavailable(error.to_string());
                        warn!(
                            event_name = "matching.pricing.unavailable",
                            item_id = item.id.as_str(),
                            error = %error,
                            "pricing skipped for item"
                        );
                    }
                }
            }
        }

        debug!(
            event_name = "matching.item.resolved",
            item_id = item.id.as_str(),
            confidence = result.confidence.value(),
            tier = result.tier.as_str(),
            "cart item resolved"
        );
        result
    }

    async fn candidates(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<CandidateProduct>, MatchError> {
        let key = cache_key(query, options, self.retailer.as_deref());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let response = self.search.search(query, options).await.map_err(|error| {
            MatchError::SearchUnavailable { query: query.to_owned(), message: error.to_string() }
        })?;
        self.cache.put(key, response.products.clone());
        Ok(response.products)
    }
}

pub struct BatchResolver {
    resolver: Arc<ItemResolver>,
    window_size: usize,
    pacing_delay: Duration,
}

impl BatchResolver {
    pub fn new(resolver: ItemResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            window_size: DEFAULT_WINDOW_SIZE,
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }

    /// Window sizes below one are treated as one.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn with_pacing_delay(mut self, pacing_delay: Duration) -> Self {
        self.pacing_delay = pacing_delay;
        self
    }

    pub async fn resolve_batch(&self, items: Vec<CartItem>) -> BatchResult {
        self.resolve_batch_with(items, &BatchCancellation::new()).await
    }

    /// Resolves every item, stopping at the next window boundary once `cancellation`
    /// fires. Items never started are returned as not processed.
    pub async fn resolve_batch_with(
        &self,
        items: Vec<CartItem>,
        cancellation: &BatchCancellation,
    ) -> BatchResult {
        let batch_id = Uuid::new_v4();
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut pending = items.into_iter().peekable();
        let mut window_index = 0usize;
        let mut cancelled = false;

        info!(
            event_name = "matching.batch.started",
            batch_id = %batch_id,
            items = total,
            window_size = self.window_size,
            "batch resolution started"
        );

        while pending.peek().is_some() {
            if window_index > 0 && !self.pacing_delay.is_zero() {
                tokio::time::sleep(self.pacing_delay).await;
            }
            if cancellation.is_cancelled() {
                cancelled = true;
                break;
            }

            let window: Vec<CartItem> = pending.by_ref().take(self.window_size).collect();
            debug!(
                event_name = "matching.batch.window_started",
                batch_id = %batch_id,
                window = window_index,
                items = window.len(),
                "resolving window"
            );

            // Handles are detached, not aborted, if this future is dropped.
            let handles: Vec<_> = window
                .into_iter()
                .map(|item| {
                    let resolver = Arc::clone(&self.resolver);
                    let span = info_span!(
                        "resolve_item",
                        batch_id = %batch_id,
                        item_id = item.id.as_str()
                    );
                    let fallback = item.clone();
                    let handle =
                        tokio::spawn(async move { resolver.resolve(item).await }.instrument(span));
                    (fallback, handle)
                })
                .collect();

            for (fallback, handle) in handles {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(error) => {
                        warn!(
                            event_name = "matching.item.task_failed",
                            batch_id = %batch_id,
                            item_id = fallback.id.as_str(),
                            error = %error,
                            "item task did not complete"
                        );
                        results.push(MatchResult::failed(fallback));
                    }
                }
            }
            window_index += 1;
        }

        if cancelled {
            let skipped = total - results.len();
            warn!(
                event_name = "matching.batch.cancelled",
                batch_id = %batch_id,
                skipped,
                "batch cancelled at window boundary"
            );
            results.extend(pending.map(MatchResult::not_processed));
        }

        let batch = BatchResult::new(batch_id, results, cancelled);
        info!(
            event_name = "matching.batch.completed",
            batch_id = %batch_id,
            items = batch.summary.total_items,
            matched = batch.summary.matched,
            failed = batch.summary.failed,
            needs_review = batch.summary.needs_review,
            average_confidence = batch.summary.average_confidence,
            "batch resolution completed"
        );
        batch
    }
}
