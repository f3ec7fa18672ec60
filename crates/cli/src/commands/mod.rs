pub mod config;
pub mod match_item;
pub mod resolve;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cartmatch_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use cartmatch_core::{
    ApplicationError, CacheEntry, CandidateProduct, HttpSearchProvider, InMemoryCatalog,
    MatchError, MatchOptions, MatchingEngine, SearchProvider, StaticPriceBook,
};
use serde::Serialize;
use tracing::{info, warn};

pub const EXIT_RUNTIME: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_SEARCH_UNAVAILABLE: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Successful command whose output is a JSON document.
    fn report(command: &str, value: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), EXIT_RUNTIME),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Renders an application error through the interface mapping used for user-facing output.
fn interface_failure(command: &str, error: ApplicationError) -> CommandResult {
    let (error_class, exit_code) = match &error {
        ApplicationError::Configuration(_) => ("config_validation", EXIT_CONFIG),
        ApplicationError::Integration(_)
        | ApplicationError::Match(
            MatchError::SearchUnavailable { .. } | MatchError::PricingUnavailable(_),
        ) => ("search_unavailable", EXIT_SEARCH_UNAVAILABLE),
        ApplicationError::Match(MatchError::CacheCorruption { .. }) => ("runtime", EXIT_RUNTIME),
        ApplicationError::MalformedInput(_)
        | ApplicationError::Match(MatchError::InvalidInput(_)) => ("input", EXIT_INPUT),
    };

    let correlation_id = format!("{command}-{}", std::process::id());
    let interface = error.into_interface(correlation_id);
    CommandResult::failure(
        command,
        error_class,
        format!("{} ({interface}; ref {})", interface.user_message(), interface.correlation_id()),
        exit_code,
    )
}

fn input_failure(command: &str, error: &anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "input", format!("{error:#}"), EXIT_INPUT)
}

fn load_config(
    command: &str,
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions { config_path, overrides, ..LoadOptions::default() }).map_err(
        |error| interface_failure(command, ApplicationError::Configuration(error.to_string())),
    )
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("could not read `{}`", path.display()))
}

fn load_catalog(path: &Path) -> anyhow::Result<InMemoryCatalog> {
    let raw = read_input(path)?;
    let products: Vec<CandidateProduct> = serde_json::from_str(&raw)
        .with_context(|| format!("`{}` is not a JSON array of products", path.display()))?;
    let catalog = InMemoryCatalog::new(products);
    if catalog.is_empty() {
        warn!(
            event_name = "cli.catalog.empty",
            path = %path.display(),
            "catalog has no products; every item will come back unmatched"
        );
    } else {
        info!(
            event_name = "cli.catalog.loaded",
            products = catalog.len(),
            path = %path.display(),
            "loaded product catalog"
        );
    }
    Ok(catalog)
}

/// Search comes from a local catalog file when given, otherwise from `search.base_url`.
fn search_provider(
    command: &str,
    config: &AppConfig,
    catalog: Option<&Path>,
) -> Result<Arc<dyn SearchProvider>, CommandResult> {
    if let Some(path) = catalog {
        return load_catalog(path)
            .map(|catalog| Arc::new(catalog) as Arc<dyn SearchProvider>)
            .map_err(|error| input_failure(command, &error));
    }

    let Some(settings) = config.search.http_settings() else {
        return Err(interface_failure(
            command,
            ApplicationError::Configuration(
                "no search backend configured: pass --catalog or set search.base_url".to_string(),
            ),
        ));
    };

    HttpSearchProvider::new(settings)
        .map(|provider| Arc::new(provider) as Arc<dyn SearchProvider>)
        .map_err(|error| {
            interface_failure(command, ApplicationError::Integration(error.to_string()))
        })
}

fn price_book(
    command: &str,
    prices: Option<&Path>,
) -> Result<Option<StaticPriceBook>, CommandResult> {
    let Some(path) = prices else {
        return Ok(None);
    };

    let book = read_input(path).and_then(|raw| {
        StaticPriceBook::from_json(&raw)
            .with_context(|| format!("`{}` is not a valid price table", path.display()))
    });
    book.map(Some).map_err(|error| input_failure(command, &error))
}

fn build_engine(
    search: Arc<dyn SearchProvider>,
    config: &AppConfig,
    options: &MatchOptions,
    prices: Option<StaticPriceBook>,
) -> MatchingEngine {
    let mut engine = MatchingEngine::new(search, options);
    match prices {
        Some(prices) => engine = engine.with_pricing(Arc::new(prices)),
        None if options.include_pricing => warn!(
            event_name = "cli.pricing.no_source",
            "pricing is enabled but no price table was given; results carry no pricing"
        ),
        None => {}
    }
    if let Some(retailer) = &config.search.retailer {
        engine = engine.with_retailer(retailer.clone());
    }
    if let Some(path) = &config.cache.snapshot_path {
        warm_cache(&engine, path);
    }
    engine
}

fn warm_cache(engine: &MatchingEngine, path: &Path) {
    if !path.exists() {
        return;
    }

    let entries = read_input(path).and_then(|raw| {
        serde_json::from_str::<Vec<CacheEntry>>(&raw)
            .with_context(|| format!("`{}` is not a cache snapshot", path.display()))
    });
    match entries {
        Ok(entries) => {
            info!(
                event_name = "cli.cache.warmed",
                entries = entries.len(),
                path = %path.display(),
                "loaded cache snapshot"
            );
            engine.cache().warm(entries);
        }
        Err(error) => warn!(
            event_name = "cli.cache.snapshot_unreadable",
            path = %path.display(),
            error = %format!("{error:#}"),
            "ignoring cache snapshot"
        ),
    }
}

fn save_cache(engine: &MatchingEngine, config: &AppConfig) {
    let Some(path) = &config.cache.snapshot_path else {
        return;
    };

    let written = serde_json::to_string_pretty(&engine.cache().snapshot())
        .context("could not serialize cache snapshot")
        .and_then(|raw| {
            fs::write(path, raw).with_context(|| format!("could not write `{}`", path.display()))
        });
    if let Err(error) = written {
        warn!(
            event_name = "cli.cache.snapshot_failed",
            path = %path.display(),
            error = %format!("{error:#}"),
            "cache snapshot not saved"
        );
    }
}

fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}
