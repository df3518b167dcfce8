use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::{BotError, Result};

/// Minimal string key-value storage used by the ledger and wallet sessions
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically add `delta` to an integer value (missing keys count as 0)
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local store, used when no Redis URL is configured and in tests
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.data.read().await.contains_key(key))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut data = self.data.write().await;
        let current = match data.get(key) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| BotError::storage(format!("value at {} is not an integer", key)))?,
            None => 0,
        };
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| BotError::storage(format!("integer overflow at {}", key)))?;
        data.insert(key.to_string(), updated.to_string());
        Ok(updated)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.write().await.remove(key);
        Ok(())
    }
}
