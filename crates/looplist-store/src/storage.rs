//! Key-value persistence for LoopList snapshots.
//!
//! The store writes its whole state under a few fixed keys on every mutation.
//! `SqliteKv` keeps them in a single-table SQLite database; `MemoryKv` keeps
//! them in process for tests and throwaway sessions.

use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable string-valued key-value store.
///
/// `put_all` must be atomic: after a failure none of the entries are visible.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn put_all(&self, entries: &[(&str, String)]) -> impl Future<Output = Result<()>> + Send;
}

/// SQLite-backed key-value store.
#[derive(Debug, Clone)]
pub struct SqliteKv {
    pool: Pool<Sqlite>,
}

impl SqliteKv {
    /// Open (creating if needed) the database at `db_path` and apply migrations.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;

        let kv = Self { pool };
        kv.migrate_embedded().await?;
        Ok(kv)
    }

    /// Run embedded migrations. Safe to repeat.
    pub async fn migrate_embedded(&self) -> Result<()> {
        let migrations = [include_str!("../../../migrations/0001_init.sql")];

        for migration_sql in migrations {
            let cleaned: String = migration_sql
                .lines()
                .filter(|line| !line.trim().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n");

            for statement in cleaned.split(';') {
                let trimmed = statement.trim();
                if !trimmed.is_empty() {
                    sqlx::query(trimmed).execute(&self.pool).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn put_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                r"
                INSERT INTO kv (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
            )
            .bind(*key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// In-process key-value store.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut map = self.lock();
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}
