//! # Bounded Insertion-Order Cache
//!
//! Shared storage behind the FBM memo and the tile cache.
//!
//! Entries are evicted in insertion order, a batch at a time, so that a
//! long pan across the world drops the tiles that were generated first.
//! Re-inserting an existing key replaces the value but keeps its original
//! position in the eviction queue.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Default fraction of capacity dropped when a full cache takes a new key.
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.25;

/// Queue entries beyond this many dead slots trigger compaction.
const COMPACT_SLACK: usize = 64;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    stamp: u64,
}

/// A hash map with a hard size bound and oldest-first batch eviction.
///
/// The queue may hold stale keys after [`BoundedCache::remove`]; each slot
/// carries a stamp so stale queue entries are skipped during eviction.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    order: VecDeque<(K, u64)>,
    capacity: usize,
    eviction_fraction: f64,
    next_stamp: u64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache that drops a quarter of its capacity when full.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_eviction(capacity, DEFAULT_EVICTION_FRACTION)
    }

    /// Creates a cache with a custom eviction batch fraction.
    ///
    /// Fractions outside `(0, 1]` fall back to evicting a single entry.
    #[must_use]
    pub fn with_eviction(capacity: usize, eviction_fraction: f64) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(1 << 16)),
            order: VecDeque::new(),
            capacity,
            eviction_fraction,
            next_stamp: 0,
        }
    }

    /// Maximum number of entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a key.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Returns true if the key is cached.
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a value, evicting the oldest batch first if the cache is full.
    ///
    /// # Returns
    /// Number of entries evicted to make room.
    pub fn insert(&mut self, key: K, value: V) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.value = value;
            return 0;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest(self.batch_size())
        } else {
            0
        };

        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.order.push_back((key.clone(), stamp));
        self.entries.insert(key, Slot { value, stamp });
        evicted
    }

    /// Removes a single key.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key).map(|slot| slot.value);
        if removed.is_some() {
            self.compact_if_sparse();
        }
        removed
    }

    /// Drops up to `count` of the oldest live entries.
    ///
    /// # Returns
    /// Number of entries actually removed.
    pub fn evict_oldest(&mut self, count: usize) -> usize {
        let mut removed = 0;
        while removed < count {
            let Some((key, stamp)) = self.order.pop_front() else {
                break;
            };
            let live = self
                .entries
                .get(&key)
                .is_some_and(|slot| slot.stamp == stamp);
            if live {
                self.entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    /// Changes the capacity, trimming the oldest entries if it shrank.
    ///
    /// # Returns
    /// Number of entries evicted.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        let excess = self.entries.len().saturating_sub(capacity);
        self.evict_oldest(excess)
    }

    /// Drops every entry. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn batch_size(&self) -> usize {
        let fraction = if self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0 {
            self.eviction_fraction
        } else {
            0.0
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let batch = (self.capacity as f64 * fraction).floor() as usize;
        batch.max(1)
    }

    fn compact_if_sparse(&mut self) {
        if self.order.len() <= self.entries.len() * 2 + COMPACT_SLACK {
            return;
        }
        let entries = &self.entries;
        self.order
            .retain(|(key, stamp)| entries.get(key).is_some_and(|slot| slot.stamp == *stamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut cache = BoundedCache::new(8);
        for i in 0..100 {
            cache.insert(i, i * 2);
            assert!(cache.len() <= 8);
        }
    }

    #[test]
    fn test_full_cache_drops_oldest_quarter() {
        let mut cache = BoundedCache::new(8);
        for i in 0..8 {
            cache.insert(i, ());
        }
        let evicted = cache.insert(8, ());
        assert_eq!(evicted, 2);
        assert!(!cache.contains_key(&0));
        assert!(!cache.contains_key(&1));
        assert!(cache.contains_key(&2));
        assert!(cache.contains_key(&8));
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut cache = BoundedCache::with_eviction(3, 0.34);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        cache.insert("a", 10);
        assert_eq!(cache.get(&"a"), Some(&10));

        cache.insert("d", 4);
        assert!(!cache.contains_key(&"a"), "a was inserted first");
    }

    #[test]
    fn test_removed_keys_are_skipped_by_eviction() {
        let mut cache = BoundedCache::with_eviction(4, 0.25);
        for i in 0..4 {
            cache.insert(i, ());
        }
        cache.remove(&0);
        cache.insert(4, ());
        cache.insert(5, ());
        // 0 was already gone, so 1 is the oldest live entry.
        assert!(!cache.contains_key(&1));
        assert!(cache.contains_key(&2));
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_shrinking_capacity_trims_oldest() {
        let mut cache = BoundedCache::new(10);
        for i in 0..10 {
            cache.insert(i, ());
        }
        assert_eq!(cache.set_capacity(4), 6);
        assert_eq!(cache.len(), 4);
        assert!(cache.contains_key(&9));
        assert!(!cache.contains_key(&5));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = BoundedCache::new(0);
        cache.insert(1, 1);
        assert!(cache.is_empty());
    }
}
