use chrono::Utc;
use sqlx::Row;

use super::{RepositoryError, SessionBlobRepository};
use crate::DbPool;

pub struct SqlSessionBlobRepository {
    pool: DbPool,
}

impl SqlSessionBlobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl SessionBlobRepository for SqlSessionBlobRepository {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM session_blob WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            row.try_get::<Vec<u8>, _>("value").map_err(|e| RepositoryError::Decode(e.to_string()))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO session_blob (key, value, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM session_blob WHERE key = ?").bind(key).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT key FROM session_blob WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key ASC",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("key").map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }
}
