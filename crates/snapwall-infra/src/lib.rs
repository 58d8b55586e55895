//! Snapwall Infrastructure Library
//!
//! Shared infrastructure used by the upload path and the thumbnail workers:
//! - Event bus (in-process and Redis Streams)
//! - Blob cache (in-process LRU and Redis)
//! - Telemetry initialization

pub mod bus;
pub mod cache;
pub mod telemetry;

// Re-export commonly used types
pub use bus::{
    BusError, BusResult, Delivery, EventBus, InMemoryBus, RedisBusConfig, RedisStreamsBus,
    Subscription,
};
pub use cache::{create_cache, Cache, CacheError, CacheResult, MemoryCache, RedisCache};
pub use telemetry::init_telemetry;
