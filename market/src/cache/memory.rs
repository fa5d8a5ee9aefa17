//! In-process cache

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::Cache;
use crate::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Cache kept in process memory; entries expire lazily on read.
#[derive(Debug, Default)]
pub struct MemoryCache {
    namespaces: RwLock<HashMap<String, HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries in `namespace`.
    pub async fn len(&self, namespace: &str) -> usize {
        let now = Instant::now();
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map(|entries| entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, namespace: &str, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<()> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clear_only_touches_one_namespace() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.put("candles", "a", "1", ttl).await.unwrap();
        cache.put("candles", "b", "2", ttl).await.unwrap();
        cache.put("schedulerConfig", "config", "{}", ttl).await.unwrap();

        cache.clear("candles").await.unwrap();

        assert_eq!(cache.get("candles", "a").await.unwrap(), None);
        assert_eq!(cache.len("candles").await, 0);
        assert_eq!(cache.get("schedulerConfig", "config").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = MemoryCache::new();
        cache.put("candles", "k", "v", Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("candles", "k").await.unwrap(), None);
    }
}
