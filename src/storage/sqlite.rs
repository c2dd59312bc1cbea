//! Embedded SQLite backend for the store contract.
//!
//! The workspace product ships with an embedded database; records live in a
//! single `records` table keyed by the opaque `entity-kind/<id>` string.

use crate::errors::{Result, SourceplaneError};
use crate::storage::store::KvStore;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`KvStore`]
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| SourceplaneError::Database {
                source: e,
                context: format!("Invalid SQLite connection string '{}'", url),
            })?
            .create_if_missing(true)
            .busy_timeout(SQLITE_BUSY_TIMEOUT)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| SourceplaneError::Database {
                source: e,
                context: "Failed to open embedded store".to_string(),
            })?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url = %url, "Embedded store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records ( \
                 key TEXT PRIMARY KEY, \
                 value TEXT NOT NULL, \
                 updated_at TEXT NOT NULL \
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SourceplaneError::Database {
            source: e,
            context: "Failed to run store migrations".to_string(),
        })?;
        Ok(())
    }

    /// Get the database pool reference
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM records WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SourceplaneError::Database {
                source: e,
                context: format!("Failed to read record '{}'", key),
            })?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        sqlx::query(
            "INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SourceplaneError::Database {
            source: e,
            context: format!("Failed to write record '{}'", key),
        })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| SourceplaneError::Database {
                source: e,
                context: format!("Failed to delete record '{}'", key),
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        // Keyspace prefixes are fixed strings without LIKE wildcards.
        let rows = sqlx::query("SELECT value FROM records WHERE key LIKE ?1 || '%' ORDER BY key")
            .bind(prefix)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SourceplaneError::Database {
                source: e,
                context: format!("Failed to scan records under '{}'", prefix),
            })?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>(0)).collect())
    }
}
