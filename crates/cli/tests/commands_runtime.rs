use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use browsetrail_cli::commands::session::SessionArgs;
use browsetrail_cli::commands::{config, history, recommend};
use serde_json::Value;
use tempfile::TempDir;

const CATALOG: &str = r#"[
  { "id": "p-100", "name": "Trail Runner", "category": "shoes", "price": 120.0, "brand": "Northpeak" },
  { "id": "p-101", "name": "Road Glide", "category": "shoes", "price": 130.0, "brand": "Swiftline" },
  { "id": "p-102", "name": "Summit Hiker", "category": "shoes", "price": 180.0, "brand": "Northpeak" },
  { "id": "p-200", "name": "Merino Socks", "category": "socks", "price": 18.0, "brand": "Northpeak" },
  { "id": "p-201", "name": "Ankle Socks", "category": "socks", "price": 15.0, "brand": "Swiftline" },
  { "id": "p-300", "name": "Hydration Vest", "category": "packs", "price": 125.0, "brand": "Ridgeway" }
]"#;

struct Workspace {
    _dir: TempDir,
    catalog: PathBuf,
    database_url: String,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let catalog = dir.path().join("catalog.json");
        fs::write(&catalog, CATALOG).expect("write catalog");
        let database_url = format!("sqlite://{}", dir.path().join("history.db").display());
        Self { _dir: dir, catalog, database_url }
    }

    fn args(&self, session: &str) -> SessionArgs {
        SessionArgs::for_session(session).with_catalog(&self.catalog)
    }
}

#[test]
fn visits_persist_across_invocations_and_feed_the_report() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_DATABASE_URL", workspace.database_url.as_str())], || {
        let args = workspace.args("alice");
        for id in ["p-100", "p-200", "p-101"] {
            let result = history::visit_product(&args, id);
            assert_eq!(result.exit_code, 0, "visit-product failed: {}", result.output);
        }
        let result = history::visit_page(&args, "/shoes", Some("Shoes"));
        assert_eq!(result.exit_code, 0, "visit-page failed: {}", result.output);

        let result = recommend::report(&args);
        assert_eq!(result.exit_code, 0, "report failed: {}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "report");
        assert_eq!(payload["status"], "ok");

        let report = &payload["data"];
        assert_eq!(ids(&report["top_viewed_products"]), vec!["p-101", "p-200", "p-100"]);
        assert_eq!(report["top_viewed_products"][0]["name"], "Road Glide");
        assert_eq!(report["top_viewed_products"][0]["view_count"], 1);
        assert_eq!(report["top_visited_pages"][0]["path"], "/shoes");
        assert_eq!(ids(&report["recommendations"]), vec!["p-102", "p-201", "p-300"]);
        let scores: Vec<u64> = report["recommendations"]
            .as_array()
            .expect("recommendations array")
            .iter()
            .map(|item| item["score"].as_u64().expect("score"))
            .collect();
        assert_eq!(scores, vec![20, 15, 10]);
        assert!((report["conversion_rate"].as_f64().expect("rate") - 0.45).abs() < 1e-9);
    });
}

#[test]
fn related_and_score_use_persisted_history() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_DATABASE_URL", workspace.database_url.as_str())], || {
        let args = workspace.args("bob");
        for id in ["p-100", "p-200", "p-101"] {
            assert_eq!(history::visit_product(&args, id).exit_code, 0);
        }

        let payload = parse_payload(&recommend::related(&args, "p-100").output);
        let related = payload["data"].as_array().expect("related array");
        let pairs: Vec<(&str, &str)> = related
            .iter()
            .map(|item| {
                (
                    item["product"]["id"].as_str().unwrap_or_default(),
                    item["source"].as_str().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(pairs, vec![("p-101", "visited_same_category"), ("p-300", "similar_price")]);

        let payload = parse_payload(&recommend::score(&args, "p-201").output);
        assert_eq!(payload["data"]["score"], 15);

        let payload = parse_payload(&recommend::score(&args, "missing").output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["score"], 0);
    });
}

#[test]
fn search_filters_feed_related_products() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_DATABASE_URL", workspace.database_url.as_str())], || {
        let args = workspace.args("carol");
        let result = history::search(&args, "socks", &["brand=Swiftline".to_string()], &[]);
        assert_eq!(result.exit_code, 0, "search failed: {}", result.output);

        let payload = parse_payload(&recommend::related(&args, "p-300").output);
        let related: Vec<&str> = payload["data"]
            .as_array()
            .expect("related array")
            .iter()
            .map(|item| item["product"]["id"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(related, vec!["p-100", "p-101", "p-201"]);
    });
}

#[test]
fn sessions_are_isolated_and_reset_clears_one() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_DATABASE_URL", workspace.database_url.as_str())], || {
        let alice = workspace.args("alice");
        let bob = workspace.args("bob");
        assert_eq!(history::visit_product(&alice, "p-100").exit_code, 0);
        assert_eq!(history::visit_product(&bob, "p-200").exit_code, 0);

        let result = history::reset(&alice);
        assert_eq!(result.exit_code, 0, "reset failed: {}", result.output);

        let alice_view = parse_payload(&history::show(&alice).output);
        let bob_view = parse_payload(&history::show(&bob).output);
        assert_eq!(alice_view["data"]["history"]["visited_products"], Value::Array(vec![]));
        assert_eq!(bob_view["data"]["history"]["visited_products"][0], "p-200");
    });
}

#[test]
fn recent_lists_only_catalog_products() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_DATABASE_URL", workspace.database_url.as_str())], || {
        let args = workspace.args("dave");
        for id in ["p-100", "retired-sku", "p-300"] {
            assert_eq!(history::visit_product(&args, id).exit_code, 0);
        }

        let payload = parse_payload(&history::recent(&args, 5).output);
        assert_eq!(ids(&payload["data"]), vec!["p-300", "p-100"]);
    });
}

#[test]
fn memory_backend_does_not_outlive_the_command() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_STORAGE_BACKEND", "memory")], || {
        let args = workspace.args("eve");
        assert_eq!(history::visit_product(&args, "p-100").exit_code, 0);

        let payload = parse_payload(&history::show(&args).output);
        assert_eq!(payload["data"]["history"]["visited_products"], Value::Array(vec![]));
    });
}

#[test]
fn missing_catalog_is_reported_with_catalog_class() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_DATABASE_URL", workspace.database_url.as_str())], || {
        let args = SessionArgs::for_session("frank").with_catalog(missing(&workspace.catalog));

        let result = recommend::report(&args);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "report");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "catalog");
    });
}

#[test]
fn invalid_env_override_fails_with_config_class() {
    with_env(&[("BROWSETRAIL_HISTORY_MAX_VISITED", "lots")], || {
        let result = history::visit_product(&SessionArgs::default(), "p-100");
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn empty_product_id_is_invalid_input() {
    let workspace = Workspace::new();
    with_env(&[("BROWSETRAIL_DATABASE_URL", workspace.database_url.as_str())], || {
        let result = history::visit_product(&workspace.args("gina"), "   ");
        assert_eq!(result.exit_code, 5);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn config_reports_env_sources() {
    let vars = [
        ("BROWSETRAIL_STORAGE_KEY", "shop:history"),
        ("BROWSETRAIL_RECOMMENDATIONS_TOP_PAGES", "3"),
    ];
    with_env(&vars, || {
        let result = config::run(&SessionArgs::default());
        assert_eq!(result.exit_code, 0, "config failed: {}", result.output);

        let payload = parse_payload(&result.output);
        let lines = payload["data"].as_array().expect("config lines");
        let storage_key = lines
            .iter()
            .find(|line| line["key"] == "storage.key")
            .expect("storage.key line");
        assert_eq!(storage_key["value"], "shop:history");
        assert_eq!(storage_key["source"], "env (BROWSETRAIL_STORAGE_KEY)");

        let max_visited = lines
            .iter()
            .find(|line| line["key"] == "history.max_visited")
            .expect("history.max_visited line");
        assert_eq!(max_visited["value"], "20");
        assert_eq!(max_visited["source"], "default");

        let top_pages = lines
            .iter()
            .find(|line| line["key"] == "recommendations.top_pages")
            .expect("recommendations.top_pages line");
        assert_eq!(top_pages["value"], "3");
        assert_eq!(top_pages["source"], "env (BROWSETRAIL_RECOMMENDATIONS_TOP_PAGES)");
    });
}

fn ids(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_str()).collect())
        .unwrap_or_default()
}

fn missing(path: &Path) -> PathBuf {
    path.with_file_name("no-such-catalog.json")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BROWSETRAIL_HISTORY_MAX_VISITED",
        "BROWSETRAIL_HISTORY_MAX_PAGES",
        "BROWSETRAIL_HISTORY_GC_MAX_AGE_DAYS",
        "BROWSETRAIL_RECOMMENDATIONS_RELATED_LIMIT",
        "BROWSETRAIL_RECOMMENDATIONS_PRICE_BAND",
        "BROWSETRAIL_RECOMMENDATIONS_TOP_PRODUCTS",
        "BROWSETRAIL_RECOMMENDATIONS_TOP_PAGES",
        "BROWSETRAIL_RECOMMENDATIONS_MAX",
        "BROWSETRAIL_STORAGE_BACKEND",
        "BROWSETRAIL_STORAGE_KEY",
        "BROWSETRAIL_DATABASE_URL",
        "BROWSETRAIL_DATABASE_MAX_CONNECTIONS",
        "BROWSETRAIL_DATABASE_TIMEOUT_SECS",
        "BROWSETRAIL_CATALOG_PATH",
        "BROWSETRAIL_LOGGING_LEVEL",
        "BROWSETRAIL_LOGGING_FORMAT",
        "BROWSETRAIL_LOG_LEVEL",
        "BROWSETRAIL_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
