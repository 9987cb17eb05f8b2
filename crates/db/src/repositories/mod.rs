use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod session_blob;

pub use memory::InMemorySessionBlobRepository;
pub use session_blob::SqlSessionBlobRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Opaque blobs keyed by storage key. The history store owns the encoding.
#[async_trait]
pub trait SessionBlobRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), RepositoryError>;
    async fn remove(&self, key: &str) -> Result<(), RepositoryError>;
    /// Keys sharing `prefix`, in ascending order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError>;
}
