use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;
use toml::Value;

use super::session::SessionArgs;
use super::CommandResult;
use browsetrail_core::config::AppConfig;

#[derive(Debug, Serialize)]
struct ConfigLine {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(args: &SessionArgs) -> CommandResult {
    let config = match args.load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                error.error_class(),
                format!("configuration issue: {error}"),
                error.exit_code(),
            );
        }
    };

    let config_file_path = args.config_path.clone().or_else(detect_config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = SourceResolver {
        doc: config_file_doc.as_ref(),
        path: config_file_path.as_deref(),
        catalog_flag: args.catalog.is_some(),
    };

    let lines = render(&config, &sources);
    CommandResult::success_with_data(
        "config",
        format!(
            "effective config from file {} (source precedence: flag > env > file > default)",
            sources.file_label()
        ),
        Some(json!(lines)),
    )
}

fn render(config: &AppConfig, sources: &SourceResolver<'_>) -> Vec<ConfigLine> {
    let entries: [(&'static str, &'static str, String); 16] = [
        (
            "history.max_visited",
            "BROWSETRAIL_HISTORY_MAX_VISITED",
            config.history.max_visited.to_string(),
        ),
        (
            "history.max_pages",
            "BROWSETRAIL_HISTORY_MAX_PAGES",
            config.history.max_pages.to_string(),
        ),
        (
            "history.gc_max_age_days",
            "BROWSETRAIL_HISTORY_GC_MAX_AGE_DAYS",
            config.history.gc_max_age_days.to_string(),
        ),
        (
            "recommendations.related_limit",
            "BROWSETRAIL_RECOMMENDATIONS_RELATED_LIMIT",
            config.recommendations.related_limit.to_string(),
        ),
        (
            "recommendations.price_band",
            "BROWSETRAIL_RECOMMENDATIONS_PRICE_BAND",
            config.recommendations.price_band.to_string(),
        ),
        (
            "recommendations.top_products",
            "BROWSETRAIL_RECOMMENDATIONS_TOP_PRODUCTS",
            config.recommendations.top_products.to_string(),
        ),
        (
            "recommendations.top_pages",
            "BROWSETRAIL_RECOMMENDATIONS_TOP_PAGES",
            config.recommendations.top_pages.to_string(),
        ),
        (
            "recommendations.max_recommendations",
            "BROWSETRAIL_RECOMMENDATIONS_MAX",
            config.recommendations.max_recommendations.to_string(),
        ),
        ("storage.backend", "BROWSETRAIL_STORAGE_BACKEND", format!("{:?}", config.storage.backend)),
        ("storage.key", "BROWSETRAIL_STORAGE_KEY", config.storage.key.clone()),
        ("database.url", "BROWSETRAIL_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "BROWSETRAIL_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "BROWSETRAIL_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        ("catalog.path", "BROWSETRAIL_CATALOG_PATH", config.catalog.path.display().to_string()),
        ("logging.level", "BROWSETRAIL_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "BROWSETRAIL_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ];

    entries
        .into_iter()
        .map(|(key, env_key, value)| ConfigLine {
            key,
            source: sources.field_source(key, env_key),
            value,
        })
        .collect()
}

struct SourceResolver<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
    catalog_flag: bool,
}

impl SourceResolver<'_> {
    fn field_source(&self, key_path: &str, env_key: &str) -> String {
        if key_path == "catalog.path" && self.catalog_flag {
            return "flag (--catalog)".to_string();
        }

        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                return format!("file ({})", self.file_label());
            }
        }

        "default".to_string()
    }

    fn file_label(&self) -> String {
        self.path.map(|path| path.display().to_string()).unwrap_or_else(|| "<none>".to_string())
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("browsetrail.toml"), PathBuf::from("config/browsetrail.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
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
