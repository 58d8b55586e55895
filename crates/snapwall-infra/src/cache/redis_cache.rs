use super::{Cache, CacheResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use snapwall_core::CacheKey;
use std::time::Duration;

/// Redis-backed cache. Entries expire after `ttl`.
pub struct RedisCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisCache {
    pub async fn connect(url: &str, ttl: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl })
    }
}

fn redis_key(key: &CacheKey) -> String {
    format!("snapwall:cache:{}", key)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(redis_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let size = value.len();
        let () = redis::cmd("SET")
            .arg(redis_key(key))
            .arg(value)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        tracing::debug!(key = %key, size_bytes = size, "Cached blob in Redis");
        Ok(())
    }
}
