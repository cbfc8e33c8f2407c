//! Thread-safe LRU map.
//!
//! Entries are ordered by a monotonically increasing access tick. The oldest
//! tick is evicted once the cache is over capacity.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 5000;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
    tick: u64,
    stats: CacheStats,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &K) {
        let tick = self.next_tick();
        if let Some((_, old)) = self.entries.get_mut(key) {
            self.order.remove(old);
            *old = tick;
            self.order.insert(tick, key.clone());
        }
    }
}

/// Bounded LRU cache safe to share between tasks
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Insert or replace an entry, marking it most recently used.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn insert(&self, key: K, value: V) -> Option<(K, V)> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();

        if let Some((_, old_tick)) = inner.entries.insert(key.clone(), (value, tick)) {
            inner.order.remove(&old_tick);
        }
        inner.order.insert(tick, key);

        if inner.entries.len() <= self.capacity {
            return None;
        }

        let (_, oldest) = inner.order.pop_first()?;
        let (value, _) = inner.entries.remove(&oldest)?;
        inner.stats.evictions += 1;
        tracing::trace!(evictions = inner.stats.evictions, "LRU entry evicted");
        Some((oldest, value))
    }

    /// Get a clone of the value and mark it most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(key).map(|(v, _)| v.clone());
        match found {
            Some(value) => {
                inner.stats.hits += 1;
                inner.touch(key);
                Some(value)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Get a clone of the value without changing its recency
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().entries.get(key).map(|(v, _)| v.clone())
    }

    /// Check if the key is present
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Remove an entry
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let (value, tick) = inner.entries.remove(key)?;
        inner.order.remove(&tick);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl<K, V> Default for LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &inner.entries.len())
            .field("stats", &inner.stats)
            .finish()
    }
}
