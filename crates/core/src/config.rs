use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::HttpSearchSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub matching: MatchingConfig,
    pub batch: BatchConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct MatchingConfig {
    pub min_confidence: f64,
    pub max_alternatives: usize,
    pub include_alternatives: bool,
    pub max_results: usize,
}

#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub window_size: usize,
    pub pacing_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
    pub retailer: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub min_confidence: Option<f64>,
    pub max_alternatives: Option<usize>,
    pub include_alternatives: Option<bool>,
    pub window_size: Option<usize>,
    pub pacing_delay_ms: Option<u64>,
    pub search_base_url: Option<String>,
    pub pricing_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matching: MatchingConfig {
                min_confidence: 0.0,
                max_alternatives: 3,
                include_alternatives: true,
                max_results: 10,
            },
            batch: BatchConfig { window_size: 3, pacing_delay_ms: 500 },
            cache: CacheConfig { ttl_ms: 15 * 60 * 1000, snapshot_path: None },
            search: SearchConfig {
                base_url: None,
                api_key: None,
                timeout_secs: 10,
                retailer: None,
            },
            pricing: PricingConfig { enabled: false },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SearchConfig {
    /// Settings for the HTTP search adapter, or `None` when no backend is configured.
    pub fn http_settings(&self) -> Option<HttpSearchSettings> {
        let base_url = self.base_url.as_ref().filter(|url| !url.trim().is_empty())?;
        Some(HttpSearchSettings {
            base_url: base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retailer: self.retailer.clone(),
        })
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cartmatch.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(matching) = patch.matching {
            if let Some(min_confidence) = matching.min_confidence {
                self.matching.min_confidence = min_confidence;
            }
            if let Some(max_alternatives) = matching.max_alternatives {
                self.matching.max_alternatives = max_alternatives;
            }
            if let Some(include_alternatives) = matching.include_alternatives {
                self.matching.include_alternatives = include_alternatives;
            }
            if let Some(max_results) = matching.max_results {
                self.matching.max_results = max_results;
            }
        }

        if let Some(batch) = patch.batch {
            if let Some(window_size) = batch.window_size {
                self.batch.window_size = window_size;
            }
            if let Some(pacing_delay_ms) = batch.pacing_delay_ms {
                self.batch.pacing_delay_ms = pacing_delay_ms;
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(ttl_ms) = cache.ttl_ms {
                self.cache.ttl_ms = ttl_ms;
            }
            if let Some(snapshot_path) = cache.snapshot_path {
                self.cache.snapshot_path = Some(snapshot_path);
            }
        }

        if let Some(search) = patch.search {
            if let Some(base_url) = search.base_url {
                self.search.base_url = Some(base_url);
            }
            if let Some(search_api_key_value) = search.api_key {
                self.search.api_key = Some(secret_value(search_api_key_value));
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
            if let Some(retailer) = search.retailer {
                self.search.retailer = Some(retailer);
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(enabled) = pricing.enabled {
                self.pricing.enabled = enabled;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARTMATCH_MATCHING_MIN_CONFIDENCE") {
            self.matching.min_confidence = parse_f64("CARTMATCH_MATCHING_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = read_env("CARTMATCH_MATCHING_MAX_ALTERNATIVES") {
            self.matching.max_alternatives =
                parse_usize("CARTMATCH_MATCHING_MAX_ALTERNATIVES", &value)?;
        }
        if let Some(value) = read_env("CARTMATCH_MATCHING_INCLUDE_ALTERNATIVES") {
            self.matching.include_alternatives =
                parse_bool("CARTMATCH_MATCHING_INCLUDE_ALTERNATIVES", &value)?;
        }
        if let Some(value) = read_env("CARTMATCH_MATCHING_MAX_RESULTS") {
            self.matching.max_results = parse_usize("CARTMATCH_MATCHING_MAX_RESULTS", &value)?;
        }

        if let Some(value) = read_env("CARTMATCH_BATCH_WINDOW_SIZE") {
            self.batch.window_size = parse_usize("CARTMATCH_BATCH_WINDOW_SIZE", &value)?;
        }
        if let Some(value) = read_env("CARTMATCH_BATCH_PACING_DELAY_MS") {
            self.batch.pacing_delay_ms = parse_u64("CARTMATCH_BATCH_PACING_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("CARTMATCH_CACHE_TTL_MS") {
            self.cache.ttl_ms = parse_u64("CARTMATCH_CACHE_TTL_MS", &value)?;
        }
        if let Some(value) = read_env("CARTMATCH_CACHE_SNAPSHOT_PATH") {
            self.cache.snapshot_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("CARTMATCH_SEARCH_BASE_URL") {
            self.search.base_url = Some(value);
        }
        if let Some(value) = read_env("CARTMATCH_SEARCH_API_KEY") {
            self.search.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CARTMATCH_SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_u64("CARTMATCH_SEARCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CARTMATCH_SEARCH_RETAILER") {
            self.search.retailer = Some(value);
        }

        if let Some(value) = read_env("CARTMATCH_PRICING_ENABLED") {
            self.pricing.enabled = parse_bool("CARTMATCH_PRICING_ENABLED", &value)?;
        }

        let log_level =
            read_env("CARTMATCH_LOGGING_LEVEL").or_else(|| read_env("CARTMATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARTMATCH_LOGGING_FORMAT").or_else(|| read_env("CARTMATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(min_confidence) = overrides.min_confidence {
            self.matching.min_confidence = min_confidence;
        }
        if let Some(max_alternatives) = overrides.max_alternatives {
            self.matching.max_alternatives = max_alternatives;
        }
        if let Some(include_alternatives) = overrides.include_alternatives {
            self.matching.include_alternatives = include_alternatives;
        }
        if let Some(window_size) = overrides.window_size {
            self.batch.window_size = window_size;
        }
        if let Some(pacing_delay_ms) = overrides.pacing_delay_ms {
            self.batch.pacing_delay_ms = pacing_delay_ms;
        }
        if let Some(search_base_url) = overrides.search_base_url {
            self.search.base_url = Some(search_base_url);
        }
        if let Some(pricing_enabled) = overrides.pricing_enabled {
            self.pricing.enabled = pricing_enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_matching(&self.matching)?;
        validate_batch(&self.batch)?;
        validate_cache(&self.cache)?;
        validate_search(&self.search)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cartmatch.toml"), PathBuf::from("config/cartmatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_matching(matching: &MatchingConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&matching.min_confidence) {
        return Err(ConfigError::Validation(
            "matching.min_confidence must be in range 0.0..=1.0".to_string(),
        ));
    }

    if matching.max_results == 0 {
        return Err(ConfigError::Validation(
            "matching.max_results must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_batch(batch: &BatchConfig) -> Result<(), ConfigError> {
    if batch.window_size == 0 {
        return Err(ConfigError::Validation(
            "batch.window_size must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_cache(cache: &CacheConfig) -> Result<(), ConfigError> {
    if cache.ttl_ms == 0 {
        return Err(ConfigError::Validation("cache.ttl_ms must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.timeout_secs == 0 || search.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "search.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if let Some(base_url) = &search.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "search.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    let blank_key =
        search.api_key.as_ref().map(|key| key.expose_secret().trim().is_empty()).unwrap_or(false);
    if blank_key {
        return Err(ConfigError::Validation(
            "search.api_key must not be blank when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    matching: Option<MatchingPatch>,
    batch: Option<BatchPatch>,
    cache: Option<CachePatch>,
    search: Option<SearchPatch>,
    pricing: Option<PricingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    min_confidence: Option<f64>,
    max_alternatives: Option<usize>,
    include_alternatives: Option<bool>,
    max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchPatch {
    window_size: Option<usize>,
    pacing_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    ttl_ms: Option<u64>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    retailer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_values() -> Result<(), String> {
        let config = AppConfig::default();

        ensure(config.matching.max_alternatives == 3, "three alternatives by default")?;
        ensure(config.matching.include_alternatives, "alternatives included by default")?;
        ensure(config.matching.max_results == 10, "ten search results by default")?;
        ensure(config.batch.window_size == 3, "window of three by default")?;
        ensure(config.batch.pacing_delay_ms == 500, "500ms pacing by default")?;
        ensure(config.cache.ttl_ms == 15 * 60 * 1000, "fifteen minute ttl")?;
        ensure(!config.pricing.enabled, "pricing disabled by default")?;
        ensure(config.search.http_settings().is_none(), "no search backend by default")?;
        config.validate().map_err(|err| format!("defaults should validate: {err}"))
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SEARCH_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cartmatch.toml");
            fs::write(
                &path,
                r#"
[search]
base_url = "https://search.example.com"
api_key = "${TEST_SEARCH_API_KEY}"
retailer = "store-12"

[cache]
snapshot_path = "cache.json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config.search.api_key.as_ref().map(|key| key.expose_secret().to_owned());
            ensure(
                api_key.as_deref() == Some("key-from-env"),
                "api key should be loaded from environment",
            )?;
            let settings =
                config.search.http_settings().ok_or("search settings should be present")?;
            ensure(settings.retailer.as_deref() == Some("store-12"), "retailer from file")?;
            ensure(
                config.cache.snapshot_path.as_deref() == Some(std::path::Path::new("cache.json")),
                "snapshot path from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SEARCH_API_KEY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_CARTMATCH_UNSET_KEY"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("cartmatch.toml");
        fs::write(&path, "[search]\napi_key = \"${TEST_CARTMATCH_UNSET_KEY}\"\n")
            .map_err(|err| err.to_string())?;

        let result =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(
                result,
                Err(ConfigError::MissingEnvInterpolation { ref var })
                    if var == "TEST_CARTMATCH_UNSET_KEY"
            ),
            "missing variable should be named in the error",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTMATCH_LOG_LEVEL", "warn");
        env::set_var("CARTMATCH_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["CARTMATCH_LOG_LEVEL", "CARTMATCH_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTMATCH_BATCH_WINDOW_SIZE", "5");
        env::set_var("CARTMATCH_MATCHING_MIN_CONFIDENCE", "0.4");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cartmatch.toml");
            fs::write(
                &path,
                r#"
[matching]
min_confidence = 0.2
max_alternatives = 5

[batch]
window_size = 4
pacing_delay_ms = 250

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    min_confidence: Some(0.6),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.matching.min_confidence == 0.6, "override min confidence should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.batch.window_size == 5, "env window size should win over file")?;
            ensure(config.batch.pacing_delay_ms == 250, "file pacing should win over default")?;
            ensure(config.matching.max_alternatives == 5, "file alternatives should apply")?;
            Ok(())
        })();

        clear_vars(&["CARTMATCH_BATCH_WINDOW_SIZE", "CARTMATCH_MATCHING_MIN_CONFIDENCE"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTMATCH_SEARCH_BASE_URL", "ftp://search.example.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("search.base_url")
            );
            ensure(has_message, "validation failure should mention search.base_url")
        })();

        clear_vars(&["CARTMATCH_SEARCH_BASE_URL"]);
        result
    }

    #[test]
    fn out_of_range_values_are_rejected() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.matching.min_confidence = 1.5;
        ensure(config.validate().is_err(), "min_confidence above one is invalid")?;

        let mut config = AppConfig::default();
        config.batch.window_size = 0;
        ensure(config.validate().is_err(), "zero window is invalid")?;

        let mut config = AppConfig::default();
        config.cache.ttl_ms = 0;
        ensure(config.validate().is_err(), "zero ttl is invalid")?;

        let mut config = AppConfig::default();
        config.search.timeout_secs = 301;
        ensure(config.validate().is_err(), "timeout above 300s is invalid")?;

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        ensure(config.validate().is_err(), "unknown log level is invalid")
    }

    #[test]
    fn malformed_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTMATCH_BATCH_PACING_DELAY_MS", "soon");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["CARTMATCH_BATCH_PACING_DELAY_MS"]);

        ensure(
            matches!(
                result,
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "CARTMATCH_BATCH_PACING_DELAY_MS"
            ),
            "bad env value should name its variable",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTMATCH_SEARCH_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["CARTMATCH_SEARCH_API_KEY"]);
        result
    }
}
