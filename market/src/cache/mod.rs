//! Namespaced key/value cache with per-entry TTL

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Query results.
pub const CANDLES_NAMESPACE: &str = "candles";
/// The scheduler config snapshot, stored under [`SCHEDULER_CONFIG_KEY`].
pub const SCHEDULER_CONFIG_NAMESPACE: &str = "schedulerConfig";
pub const SCHEDULER_CONFIG_KEY: &str = "config";

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    async fn put(&self, namespace: &str, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Drops every entry of `namespace`.
    async fn clear(&self, namespace: &str) -> Result<()>;
}
