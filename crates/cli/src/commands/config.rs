use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cartmatch_core::config::ConfigOverrides;
use secrecy::ExposeSecret;
use toml::Value;

use super::{load_config, CommandResult};

const COMMAND: &str = "config";

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match load_config(COMMAND, config_path.clone(), ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "matching.min_confidence",
        &config.matching.min_confidence.to_string(),
        source("matching.min_confidence", &["CARTMATCH_MATCHING_MIN_CONFIDENCE"]),
    ));
    lines.push(render_line(
        "matching.max_alternatives",
        &config.matching.max_alternatives.to_string(),
        source("matching.max_alternatives", &["CARTMATCH_MATCHING_MAX_ALTERNATIVES"]),
    ));
    lines.push(render_line(
        "matching.include_alternatives",
        &config.matching.include_alternatives.to_string(),
        source("matching.include_alternatives", &["CARTMATCH_MATCHING_INCLUDE_ALTERNATIVES"]),
    ));
    lines.push(render_line(
        "matching.max_results",
        &config.matching.max_results.to_string(),
        source("matching.max_results", &["CARTMATCH_MATCHING_MAX_RESULTS"]),
    ));

    lines.push(render_line(
        "batch.window_size",
        &config.batch.window_size.to_string(),
        source("batch.window_size", &["CARTMATCH_BATCH_WINDOW_SIZE"]),
    ));
    lines.push(render_line(
        "batch.pacing_delay_ms",
        &config.batch.pacing_delay_ms.to_string(),
        source("batch.pacing_delay_ms", &["CARTMATCH_BATCH_PACING_DELAY_MS"]),
    ));

    lines.push(render_line(
        "cache.ttl_ms",
        &config.cache.ttl_ms.to_string(),
        source("cache.ttl_ms", &["CARTMATCH_CACHE_TTL_MS"]),
    ));
    let snapshot_path = config
        .cache
        .snapshot_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "cache.snapshot_path",
        &snapshot_path,
        source("cache.snapshot_path", &["CARTMATCH_CACHE_SNAPSHOT_PATH"]),
    ));

    lines.push(render_line(
        "search.base_url",
        config.search.base_url.as_deref().unwrap_or("<unset>"),
        source("search.base_url", &["CARTMATCH_SEARCH_BASE_URL"]),
    ));
    let api_key = config
        .search
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "search.api_key",
        &api_key,
        source("search.api_key", &["CARTMATCH_SEARCH_API_KEY"]),
    ));
    lines.push(render_line(
        "search.timeout_secs",
        &config.search.timeout_secs.to_string(),
        source("search.timeout_secs", &["CARTMATCH_SEARCH_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "search.retailer",
        config.search.retailer.as_deref().unwrap_or("<unset>"),
        source("search.retailer", &["CARTMATCH_SEARCH_RETAILER"]),
    ));

    lines.push(render_line(
        "pricing.enabled",
        &config.pricing.enabled.to_string(),
        source("pricing.enabled", &["CARTMATCH_PRICING_ENABLED"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["CARTMATCH_LOGGING_LEVEL", "CARTMATCH_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["CARTMATCH_LOGGING_FORMAT", "CARTMATCH_LOG_FORMAT"]),
    ));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    let root = PathBuf::from("cartmatch.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cartmatch.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps at most the first four characters of a key.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.chars().count() <= 8 {
        return "<redacted>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}
