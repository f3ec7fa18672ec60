use std::path::PathBuf;

use cartmatch_core::config::ConfigOverrides;
use cartmatch_core::{CartItem, MatchOptions, ValidationFlag};
use clap::Args;

use super::{
    build_engine, load_config, runtime, save_cache, search_provider, CommandResult, EXIT_INPUT,
    EXIT_SEARCH_UNAVAILABLE,
};

const COMMAND: &str = "match";

#[derive(Debug, Clone, Default, Args)]
pub struct MatchArgs {
    #[arg(long, help = "Item name as typed on the grocery list")]
    pub name: String,
    #[arg(long)]
    pub brand: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, help = "Package size, e.g. `1 gal` or `12 oz`")]
    pub size: Option<String>,
    #[arg(long, help = "JSON file of candidate products to search instead of search.base_url")]
    pub catalog: Option<PathBuf>,
    #[arg(long, help = "Confidence floor for a best match (0.0..=1.0)")]
    pub min_confidence: Option<f64>,
}

impl MatchArgs {
    fn item(&self) -> CartItem {
        let mut item = CartItem::new("cli-1", self.name.clone());
        item.brand = self.brand.clone();
        item.category = self.category.clone();
        item.size = self.size.clone();
        item
    }
}

pub fn run(args: &MatchArgs, config_path: Option<PathBuf>) -> CommandResult {
    let overrides =
        ConfigOverrides { min_confidence: args.min_confidence, ..ConfigOverrides::default() };
    let config = match load_config(COMMAND, config_path, overrides) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let item = args.item();
    if item.has_blank_name() {
        return CommandResult::failure(COMMAND, "input", "item name must not be blank", EXIT_INPUT);
    }

    let search = match search_provider(COMMAND, &config, args.catalog.as_deref()) {
        Ok(search) => search,
        Err(failure) => return failure,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let options = MatchOptions::from(&config);
    let engine = build_engine(search, &config, &options, None);
    let result = runtime.block_on(engine.validate_single_item(item, &options));
    save_cache(&engine, &config);

    if result.has_flag(ValidationFlag::ValidationFailed) {
        return CommandResult::failure(
            COMMAND,
            "search_unavailable",
            format!("search failed for `{}`", args.name.trim()),
            EXIT_SEARCH_UNAVAILABLE,
        );
    }

    CommandResult::report(COMMAND, &result)
}
