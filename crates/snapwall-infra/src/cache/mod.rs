//! Blob cache
//!
//! Best-effort byte cache keyed by `(event_id, asset_id)`. Callers treat every
//! cache error as a warning and fall back to storage.

mod memory;
mod redis_cache;

pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

use async_trait::async_trait;
use snapwall_core::{CacheKey, CacheMode, ErrorKind};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transient
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>>;

    /// Last write wins.
    async fn set(&self, key: &CacheKey, value: Vec<u8>) -> CacheResult<()>;
}

/// Build the cache selected by `CACHE_MODE`. `None` disables caching.
pub async fn create_cache(
    mode: CacheMode,
    redis_url: &str,
    capacity: usize,
    ttl: Duration,
) -> CacheResult<Option<Arc<dyn Cache>>> {
    match mode {
        CacheMode::None => Ok(None),
        CacheMode::Memory => Ok(Some(Arc::new(MemoryCache::new(capacity)))),
        CacheMode::Redis => Ok(Some(Arc::new(RedisCache::connect(redis_url, ttl).await?))),
    }
}
