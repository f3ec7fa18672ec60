pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod matching;
pub mod pricing;
pub mod resolver;
pub mod search;

pub use cache::{cache_key, CacheEntry, CacheStats, SearchCache};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::item::{parse_cart_items, CartItem, CartItemId};
pub use domain::matching::{
    Alternative, BatchResult, BatchSummary, ComponentScores, ConfidenceScore, ConfidenceTier,
    MatchResult, RecommendedAction, TierCounts, ValidationFlag,
};
pub use domain::product::{Availability, CandidateProduct, ProductId};
pub use engine::{MatchOptions, MatchingEngine};
pub use errors::{ApplicationError, InterfaceError, MatchError};
pub use pricing::{PriceAggregator, PricingError, PricingInfo, SourcePrice, StaticPriceBook};
pub use resolver::{BatchCancellation, BatchResolver, ItemResolver, ResolveOptions};
pub use search::{
    HttpSearchProvider, HttpSearchSettings, InMemoryCatalog, SearchError, SearchOptions,
    SearchProvider, SearchResponse,
};
