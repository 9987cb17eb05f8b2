use std::path::PathBuf;

use anyhow::Context;
use browsetrail_core::catalog::StaticCatalog;
use browsetrail_core::config::{AppConfig, ConfigOverrides, LoadOptions, StorageBackend};
use browsetrail_core::errors::ApplicationError;
use browsetrail_core::history::{HistoryStore, LoadOutcome};
use browsetrail_core::storage::{BlobStore, MemoryBlobStore};
use browsetrail_db::BlockingBlobStore;
use clap::Args;
use tracing::{info, warn};

/// Options shared by every history command.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    #[arg(long, global = true, default_value = "default", help = "Session key to operate on")]
    pub session: String,
    #[arg(long, global = true, help = "Catalog JSON file (overrides catalog.path)")]
    pub catalog: Option<PathBuf>,
    #[arg(long = "config", global = true, help = "Explicit config file path")]
    pub config_path: Option<PathBuf>,
}

impl Default for SessionArgs {
    fn default() -> Self {
        Self { session: "default".to_string(), catalog: None, config_path: None }
    }
}

impl SessionArgs {
    pub fn for_session(session: impl Into<String>) -> Self {
        Self { session: session.into(), ..Self::default() }
    }

    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog = Some(path.into());
        self
    }

    pub fn load_config(&self) -> Result<AppConfig, ApplicationError> {
        let options = LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides {
                catalog_path: self.catalog.clone(),
                ..ConfigOverrides::default()
            },
        };
        Ok(AppConfig::load(options)?)
    }
}

/// A loaded session: effective config plus the rehydrated history store.
pub struct SessionContext {
    pub config: AppConfig,
    pub store: HistoryStore,
}

impl SessionContext {
    pub fn open(args: &SessionArgs) -> anyhow::Result<Self> {
        if args.session.trim().is_empty() {
            return Err(ApplicationError::InvalidInput("session key must not be empty".to_string())
                .into());
        }

        let config = args.load_config().context("loading configuration")?;
        let storage = open_storage(&config).context("opening history storage")?;
        let storage_key = format!("{}:{}", config.storage.key, args.session);

        let mut store = HistoryStore::new(storage)
            .with_limits(config.history.limits())
            .with_storage_key(storage_key.clone());

        match store.load() {
            LoadOutcome::Discarded(reason) => warn!(
                event_name = "cli.session.discarded",
                storage_key = %storage_key,
                reason = ?reason,
                "persisted history discarded"
            ),
            outcome => info!(
                event_name = "cli.session.loaded",
                storage_key = %storage_key,
                outcome = ?outcome,
                "history session loaded"
            ),
        }

        Ok(Self { config, store })
    }

    pub fn catalog(&self) -> anyhow::Result<StaticCatalog> {
        let path = &self.config.catalog.path;
        StaticCatalog::from_json_file(path)
            .map_err(ApplicationError::from)
            .with_context(|| format!("loading catalog `{}`", path.display()))
    }
}

fn open_storage(config: &AppConfig) -> Result<Box<dyn BlobStore>, ApplicationError> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Box::new(MemoryBlobStore::new())),
        StorageBackend::Sqlite => {
            let store = BlockingBlobStore::open_sqlite(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )?;
            Ok(Box::new(store))
        }
    }
}
