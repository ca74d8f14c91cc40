//! Short-lived response cache.

mod ttl_cache;

pub use ttl_cache::{CacheStats, DEFAULT_CACHE_CAPACITY, TtlCache};
