use std::path::PathBuf;

use cartmatch_core::config::ConfigOverrides;
use cartmatch_core::{parse_cart_items, MatchOptions};
use clap::Args;

use super::{
    build_engine, input_failure, interface_failure, load_config, price_book, read_input, runtime,
    save_cache, search_provider, CommandResult, EXIT_SEARCH_UNAVAILABLE,
};

const COMMAND: &str = "resolve";

#[derive(Debug, Clone, Default, Args)]
pub struct ResolveArgs {
    #[arg(long, help = "JSON file holding an array of cart items")]
    pub items: PathBuf,
    #[arg(long, help = "JSON file of candidate products to search instead of search.base_url")]
    pub catalog: Option<PathBuf>,
    #[arg(long, help = "JSON price table keyed by product id; enables pricing")]
    pub prices: Option<PathBuf>,
    #[arg(long, help = "Items searched concurrently per window")]
    pub window: Option<usize>,
    #[arg(long, help = "Delay between windows in milliseconds")]
    pub pacing_ms: Option<u64>,
    #[arg(long, help = "Confidence floor for a best match (0.0..=1.0)")]
    pub min_confidence: Option<f64>,
    #[arg(long, help = "Maximum alternatives per item")]
    pub max_alternatives: Option<usize>,
    #[arg(long, help = "Return best matches only")]
    pub no_alternatives: bool,
}

impl ResolveArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_confidence: self.min_confidence,
            max_alternatives: self.max_alternatives,
            include_alternatives: self.no_alternatives.then_some(false),
            window_size: self.window,
            pacing_delay_ms: self.pacing_ms,
            pricing_enabled: self.prices.as_ref().map(|_| true),
            ..ConfigOverrides::default()
        }
    }
}

pub fn run(args: &ResolveArgs, config_path: Option<PathBuf>) -> CommandResult {
    let config = match load_config(COMMAND, config_path, args.overrides()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let raw = match read_input(&args.items) {
        Ok(raw) => raw,
        Err(error) => return input_failure(COMMAND, &error),
    };
    let items = match parse_cart_items(&raw) {
        Ok(items) => items,
        Err(error) => return interface_failure(COMMAND, error),
    };

    let search = match search_provider(COMMAND, &config, args.catalog.as_deref()) {
        Ok(search) => search,
        Err(failure) => return failure,
    };
    let prices = match price_book(COMMAND, args.prices.as_deref()) {
        Ok(prices) => prices,
        Err(failure) => return failure,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let options = MatchOptions::from(&config);
    let engine = build_engine(search, &config, &options, prices);
    let searchable = items.iter().filter(|item| !item.has_blank_name()).count();
    let batch = runtime.block_on(engine.validate_cart_items(items, &options));
    save_cache(&engine, &config);

    let blank = batch.results.len() - searchable;
    let search_failures = batch.summary.failed.saturating_sub(blank);
    if searchable > 0 && search_failures == searchable {
        return CommandResult::failure(
            COMMAND,
            "search_unavailable",
            format!("search failed for all {searchable} items"),
            EXIT_SEARCH_UNAVAILABLE,
        );
    }

    CommandResult::report(COMMAND, &batch)
}
