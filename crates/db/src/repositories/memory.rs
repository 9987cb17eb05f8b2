use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::{RepositoryError, SessionBlobRepository};

#[derive(Default)]
pub struct InMemorySessionBlobRepository {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

#[async_trait::async_trait]
impl SessionBlobRepository for InMemorySessionBlobRepository {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), RepositoryError> {
        let mut blobs = self.blobs.write().await;
        blobs.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.keys().filter(|key| key.starts_with(prefix)).cloned().collect())
    }
}
