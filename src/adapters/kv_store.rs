//! KV adapter (one of the six capability interfaces): TTL-keyed cache for trending
//! snapshots. `retainer` is already a dependency but never wired up elsewhere —
//! `crawler.rs` carries a `// FIXME: use retainer cache with expiration` next to a
//! plain `Mutex<HashMap>`. This adapter is that cache, finally built.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use retainer::Cache;
use serde_json::Value;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl_secs: u64);
}

pub struct RetainerKvStore {
    cache: Arc<Cache<String, Value>>,
}

impl RetainerKvStore {
    pub fn new() -> Self {
        let cache = Arc::new(Cache::new());
        let monitor = cache.clone();
        tokio::spawn(async move {
            monitor.monitor(4, 0.25, Duration::from_secs(60)).await;
        });
        RetainerKvStore { cache }
    }
}

impl Default for RetainerKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for RetainerKvStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.cache.get(&key.to_string()).await.map(|guard| guard.value().clone())
    }

    async fn set(&self, key: &str, value: Value, ttl_secs: u64) {
        self.cache
            .insert(key.to_string(), value, Duration::from_secs(ttl_secs))
            .await;
    }
}

/// In-memory fake without real expiration bookkeeping — tests that need TTL
/// semantics assert on the stored value, not on wall-clock expiry.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: tokio::sync::Mutex<std::collections::HashMap<String, Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value, _ttl_secs: u64) {
        self.entries.lock().await.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_a_value() {
        let kv = InMemoryKvStore::new();
        kv.set("trending:global", json!({"topics": []}), 1800).await;
        let value = kv.get("trending:global").await.unwrap();
        assert_eq!(value["topics"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let kv = InMemoryKvStore::new();
        assert!(kv.get("trending:ZW").await.is_none());
    }
}
