//! Redis-backed cache

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::cache::Cache;
use crate::Result;

const SCAN_BATCH: usize = 200;

/// Keys are laid out as `<prefix>:<namespace>:<key>`.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisCache {
    pub fn new(conn: MultiplexedConnection, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, namespace: &str, key: &str) -> String {
        format!("{}:{}:{}", self.prefix, namespace, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.full_key(namespace, key)).await?;
        Ok(value)
    }

    async fn put(&self, namespace: &str, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(self.full_key(namespace, key), value, seconds).await?;
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let pattern = self.full_key(namespace, "*");
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                removed += keys.len();
                let _: () = conn.del(keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(namespace, removed, "cleared cache namespace");
        Ok(())
    }
}
