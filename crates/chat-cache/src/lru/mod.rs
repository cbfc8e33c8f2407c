//! Bounded least-recently-used store

mod lru_cache;

pub use lru_cache::{CacheStats, LruCache, DEFAULT_CAPACITY};
