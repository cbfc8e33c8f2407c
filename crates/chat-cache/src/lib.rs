//! # chat-cache
//!
//! In-memory caching for entities seen on the gateway.
//!
//! ## Features
//!
//! - **LRU store**: A bounded, thread-safe least-recently-used map
//!
//! ## Example
//!
//! ```
//! use chat_cache::LruCache;
//!
//! let cache = LruCache::new(2);
//! cache.insert(1, "one");
//! cache.insert(2, "two");
//! cache.get(&1);
//! cache.insert(3, "three");
//!
//! // 2 was the least recently used entry
//! assert!(!cache.contains(&2));
//! ```

pub mod lru;

pub use lru::{CacheStats, LruCache, DEFAULT_CAPACITY};
