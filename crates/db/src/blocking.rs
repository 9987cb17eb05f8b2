//! Synchronous [`BlobStore`] over an async [`SessionBlobRepository`].
//!
//! The history store persists synchronously, so this adapter owns a current-thread tokio
//! runtime and drives each repository call to completion with `block_on`. It must not be
//! used from inside another tokio runtime.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use browsetrail_core::errors::StorageError;
use browsetrail_core::storage::BlobStore;

use crate::repositories::{RepositoryError, SessionBlobRepository, SqlSessionBlobRepository};
use crate::{connect_with_settings, migrations};

// Field order matters: the repository (and its pool) drops before the runtime.
pub struct BlockingBlobStore {
    repository: Arc<dyn SessionBlobRepository>,
    runtime: Runtime,
}

impl BlockingBlobStore {
    pub fn new(repository: Arc<dyn SessionBlobRepository>) -> Result<Self, StorageError> {
        Ok(Self { repository, runtime: build_runtime()? })
    }

    /// Connects to `database_url`, applies pending migrations and wraps the sqlx repository.
    pub fn open_sqlite(
        database_url: &str,
        max_connections: u32,
        timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let runtime = build_runtime()?;

        let pool = runtime.block_on(async {
            let pool = connect_with_settings(database_url, max_connections, timeout_secs)
                .await
                .map_err(|error| StorageError::Unavailable(format!("connect failed: {error}")))?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| StorageError::Unavailable(format!("migration failed: {error}")))?;
            Ok::<_, StorageError>(pool)
        })?;

        debug!(event_name = "db.blob_store.opened", "sqlite blob store ready");
        Ok(Self { repository: Arc::new(SqlSessionBlobRepository::new(pool)), runtime })
    }

    pub fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.runtime.block_on(self.repository.list_keys(prefix)).map_err(backend_error)
    }
}

impl BlobStore for BlockingBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.runtime.block_on(self.repository.get(key)).map_err(backend_error)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.runtime.block_on(self.repository.set(key, value)).map_err(backend_error)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.runtime.block_on(self.repository.remove(key)).map_err(backend_error)
    }
}

fn build_runtime() -> Result<Runtime, StorageError> {
    Builder::new_current_thread().enable_all().build().map_err(|error| {
        StorageError::Unavailable(format!("failed to initialize async runtime: {error}"))
    })
}

fn backend_error(error: RepositoryError) -> StorageError {
    warn!(event_name = "db.blob_store.failed", error = %error, "blob store operation failed");
    StorageError::Backend(error.to_string())
}
