use super::{Cache, CacheResult};
use async_trait::async_trait;
use lru::LruCache;
use snapwall_core::CacheKey;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Bounded in-process LRU cache
pub struct MemoryCache {
    entries: Mutex<LruCache<CacheKey, Vec<u8>>>,
}

impl MemoryCache {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>) -> CacheResult<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.put(key.clone(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = MemoryCache::new(4);
        let key = CacheKey::new(1, "abc");

        assert_eq!(cache.get(&key).await.unwrap(), None);
        cache.set(&key, b"one".to_vec()).await.unwrap();
        cache.set(&key, b"two".to_vec()).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        let (a, b, c) = (CacheKey::new(1, "a"), CacheKey::new(1, "b"), CacheKey::new(1, "c"));

        cache.set(&a, vec![1]).await.unwrap();
        cache.set(&b, vec![2]).await.unwrap();
        cache.get(&a).await.unwrap();
        cache.set(&c, vec![3]).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&b).await.unwrap().is_none());
        assert!(cache.get(&a).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_keys_are_scoped_by_event() {
        let cache = MemoryCache::new(0);
        cache.set(&CacheKey::new(1, "x"), vec![1]).await.unwrap();
        assert!(cache.get(&CacheKey::new(2, "x")).await.unwrap().is_none());
    }
}
