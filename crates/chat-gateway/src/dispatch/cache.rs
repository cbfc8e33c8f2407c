//! Cache sink for decoded events

use std::sync::Arc;

use chat_cache::{CacheStats, LruCache};
use chat_core::Snowflake;

use crate::events::Event;

/// Receives every decoded dispatch before handlers run
pub trait CacheSink: Send + Sync {
    fn store(&self, event_name: &str, event: &Arc<Event>);
}

/// Most recent event per entity id, bounded by LRU eviction
pub struct EntityCache {
    entries: LruCache<Snowflake, Arc<Event>>,
}

impl EntityCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Latest event carrying `id`; refreshes its recency
    pub fn resolve(&self, id: Snowflake) -> Option<Arc<Event>> {
        self.entries.get(&id)
    }

    /// Forget `id`, e.g. after a delete event
    pub fn evict(&self, id: Snowflake) -> Option<Arc<Event>> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.stats()
    }
}

impl CacheSink for EntityCache {
    fn store(&self, event_name: &str, event: &Arc<Event>) {
        let Some(id) = event.id() else {
            return;
        };
        if let Some((evicted, _)) = self.entries.insert(id, Arc::clone(event)) {
            tracing::trace!(event = %event_name, evicted = %evicted, "Evicted cached entity");
        }
    }
}

impl std::fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.capacity())
            .finish()
    }
}
