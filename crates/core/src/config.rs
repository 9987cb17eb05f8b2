use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::{HistoryLimits, DAY_MS, DEFAULT_STORAGE_KEY, MAX_PAGES, MAX_VISITED};
use crate::recommendations::{RecommendationSettings, DEFAULT_SETTINGS};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub history: HistoryConfig,
    pub recommendations: RecommendationsConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct HistoryConfig {
    pub max_visited: usize,
    pub max_pages: usize,
    pub gc_max_age_days: u32,
}

#[derive(Clone, Debug)]
pub struct RecommendationsConfig {
    pub related_limit: usize,
    pub price_band: f64,
    pub top_products: usize,
    pub top_pages: usize,
    pub max_recommendations: usize,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub key: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Sqlite,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub storage_backend: Option<StorageBackend>,
    pub storage_key: Option<String>,
    pub catalog_path: Option<PathBuf>,
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
            history: HistoryConfig {
                max_visited: MAX_VISITED,
                max_pages: MAX_PAGES,
                gc_max_age_days: 30,
            },
            recommendations: RecommendationsConfig {
                related_limit: DEFAULT_SETTINGS.related_limit,
                price_band: DEFAULT_SETTINGS.price_band,
                top_products: DEFAULT_SETTINGS.top_products,
                top_pages: DEFAULT_SETTINGS.top_pages,
                max_recommendations: DEFAULT_SETTINGS.max_recommendations,
            },
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
                key: DEFAULT_STORAGE_KEY.to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://browsetrail.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            catalog: CatalogConfig { path: PathBuf::from("catalog.json") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend `{other}` (expected memory|sqlite)"
            ))),
        }
    }
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

impl HistoryConfig {
    pub fn limits(&self) -> HistoryLimits {
        HistoryLimits {
            max_visited: self.max_visited,
            max_pages: self.max_pages,
            gc_max_age_ms: i64::from(self.gc_max_age_days) * DAY_MS,
        }
    }
}

impl RecommendationsConfig {
    pub fn settings(&self) -> RecommendationSettings {
        RecommendationSettings {
            related_limit: self.related_limit,
            price_band: self.price_band,
            top_products: self.top_products,
            top_pages: self.top_pages,
            max_recommendations: self.max_recommendations,
        }
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("browsetrail.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(history) = patch.history {
            if let Some(max_visited) = history.max_visited {
                self.history.max_visited = max_visited;
            }
            if let Some(max_pages) = history.max_pages {
                self.history.max_pages = max_pages;
            }
            if let Some(gc_max_age_days) = history.gc_max_age_days {
                self.history.gc_max_age_days = gc_max_age_days;
            }
        }

        if let Some(recommendations) = patch.recommendations {
            if let Some(related_limit) = recommendations.related_limit {
                self.recommendations.related_limit = related_limit;
            }
            if let Some(price_band) = recommendations.price_band {
                self.recommendations.price_band = price_band;
            }
            if let Some(top_products) = recommendations.top_products {
                self.recommendations.top_products = top_products;
            }
            if let Some(top_pages) = recommendations.top_pages {
                self.recommendations.top_pages = top_pages;
            }
            if let Some(max_recommendations) = recommendations.max_recommendations {
                self.recommendations.max_recommendations = max_recommendations;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if let Some(key) = storage.key {
                self.storage.key = key;
            }
        }

        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = path;
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
        if let Some(value) = read_env("BROWSETRAIL_HISTORY_MAX_VISITED") {
            self.history.max_visited = parse_usize("BROWSETRAIL_HISTORY_MAX_VISITED", &value)?;
        }
        if let Some(value) = read_env("BROWSETRAIL_HISTORY_MAX_PAGES") {
            self.history.max_pages = parse_usize("BROWSETRAIL_HISTORY_MAX_PAGES", &value)?;
        }
        if let Some(value) = read_env("BROWSETRAIL_HISTORY_GC_MAX_AGE_DAYS") {
            self.history.gc_max_age_days =
                parse_u32("BROWSETRAIL_HISTORY_GC_MAX_AGE_DAYS", &value)?;
        }

        if let Some(value) = read_env("BROWSETRAIL_RECOMMENDATIONS_RELATED_LIMIT") {
            self.recommendations.related_limit =
                parse_usize("BROWSETRAIL_RECOMMENDATIONS_RELATED_LIMIT", &value)?;
        }
        if let Some(value) = read_env("BROWSETRAIL_RECOMMENDATIONS_PRICE_BAND") {
            self.recommendations.price_band =
                parse_f64("BROWSETRAIL_RECOMMENDATIONS_PRICE_BAND", &value)?;
        }
        if let Some(value) = read_env("BROWSETRAIL_RECOMMENDATIONS_TOP_PRODUCTS") {
            self.recommendations.top_products =
                parse_usize("BROWSETRAIL_RECOMMENDATIONS_TOP_PRODUCTS", &value)?;
        }
        if let Some(value) = read_env("BROWSETRAIL_RECOMMENDATIONS_TOP_PAGES") {
            self.recommendations.top_pages =
                parse_usize("BROWSETRAIL_RECOMMENDATIONS_TOP_PAGES", &value)?;
        }
        if let Some(value) = read_env("BROWSETRAIL_RECOMMENDATIONS_MAX") {
            self.recommendations.max_recommendations =
                parse_usize("BROWSETRAIL_RECOMMENDATIONS_MAX", &value)?;
        }

        if let Some(value) = read_env("BROWSETRAIL_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = read_env("BROWSETRAIL_STORAGE_KEY") {
            self.storage.key = value;
        }

        if let Some(value) = read_env("BROWSETRAIL_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BROWSETRAIL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("BROWSETRAIL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BROWSETRAIL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BROWSETRAIL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BROWSETRAIL_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(value);
        }

        let log_level =
            read_env("BROWSETRAIL_LOGGING_LEVEL").or_else(|| read_env("BROWSETRAIL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BROWSETRAIL_LOGGING_FORMAT").or_else(|| read_env("BROWSETRAIL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(backend) = overrides.storage_backend {
            self.storage.backend = backend;
        }
        if let Some(key) = overrides.storage_key {
            self.storage.key = key;
        }
        if let Some(path) = overrides.catalog_path {
            self.catalog.path = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_history(&self.history)?;
        validate_recommendations(&self.recommendations)?;
        validate_storage(&self.storage)?;
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("browsetrail.toml"), PathBuf::from("config/browsetrail.toml")]
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

fn validate_history(history: &HistoryConfig) -> Result<(), ConfigError> {
    if history.max_visited == 0 {
        return Err(ConfigError::Validation(
            "history.max_visited must be greater than zero".to_string(),
        ));
    }
    if history.max_pages == 0 {
        return Err(ConfigError::Validation(
            "history.max_pages must be greater than zero".to_string(),
        ));
    }
    if history.gc_max_age_days == 0 || history.gc_max_age_days > 3_650 {
        return Err(ConfigError::Validation(
            "history.gc_max_age_days must be in range 1..=3650".to_string(),
        ));
    }
    Ok(())
}

fn validate_recommendations(recommendations: &RecommendationsConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&recommendations.price_band) {
        return Err(ConfigError::Validation(
            "recommendations.price_band must be a fraction in range 0.0..=1.0".to_string(),
        ));
    }
    if recommendations.related_limit == 0 || recommendations.max_recommendations == 0 {
        return Err(ConfigError::Validation(
            "recommendations.related_limit and recommendations.max_recommendations must be greater than zero"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.key.trim().is_empty() {
        return Err(ConfigError::Validation("storage.key must not be empty".to_string()));
    }
    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    history: Option<HistoryPatch>,
    recommendations: Option<RecommendationsPatch>,
    storage: Option<StoragePatch>,
    database: Option<DatabasePatch>,
    catalog: Option<CatalogPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryPatch {
    max_visited: Option<usize>,
    max_pages: Option<usize>,
    gc_max_age_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationsPatch {
    related_limit: Option<usize>,
    price_band: Option<f64>,
    top_products: Option<usize>,
    top_pages: Option<usize>,
    max_recommendations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    backend: Option<StorageBackend>,
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
