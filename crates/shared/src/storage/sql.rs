use async_trait::async_trait;
use sqlx::Row;

use super::KvBackend;
use crate::db::pool::Db;
use crate::error::{NoFlakeError, Result};

/// Persistent backend on the `kv_store` table.
#[derive(Clone)]
pub struct SqlKv {
    db: Db,
}

impl SqlKv {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn storage_err(e: sqlx::Error) -> NoFlakeError {
    NoFlakeError::Storage(e.to_string())
}

#[async_trait]
impl KvBackend for SqlKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.db.0)
            .await
            .map_err(storage_err)?;
        row.map(|r| r.try_get::<String, _>("value"))
            .transpose()
            .map_err(storage_err)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.db.0)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}
