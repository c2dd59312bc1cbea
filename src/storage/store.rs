//! Storage collaborator contract.
//!
//! The core persists records through this narrow key/value interface: keys
//! are `entity-kind/<id>` strings, values are the serialized records. What
//! sits behind it (embedded SQLite, a remote store) is the collaborator's
//! concern, not this crate's.

use crate::errors::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Key/value store contract consumed by the repositories
#[async_trait]
pub trait KvStore: Send + Sync + std::fmt::Debug {
    /// Fetch the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any prior value
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key`; returns whether a record was actually removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Values of every record whose key starts with `prefix`, in key order
    async fn scan(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory store for tests and ephemeral workspaces
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.records.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        let records = self.records.read().await;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, value)| value.clone())
            .collect())
    }
}
