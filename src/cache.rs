//! Cycle cache: the set of dedup keys already decomposed during a run.
//!
//! Backed by [`HashSet`], so there are no collisions and no false positives: a
//! key reported as seen really was inserted before. Hits are jobs dropped as
//! duplicates; misses are jobs that went on to be decomposed.

use std::collections::HashSet;
use std::hash::Hash;

pub struct CycleCache<K> {
    seen: HashSet<K>,
    hits: usize,
    misses: usize,
}

impl<K> Default for CycleCache<K> {
    fn default() -> Self {
        Self::new(14)
    }
}

impl<K> CycleCache<K> {
    /// Creates a cache with room for `2^bits` keys before the first resize.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");
        Self {
            seen: HashSet::with_capacity(1 << bits),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Number of keys found already present.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of keys inserted for the first time.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Forgets every key and resets the counters.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

impl<K> CycleCache<K>
where
    K: Hash + Eq,
{
    /// Test-and-insert: returns `true` if `key` was already present.
    #[inline]
    pub fn seen(&mut self, key: K) -> bool {
        if self.seen.insert(key) {
            self.misses += 1;
            false
        } else {
            self.hits += 1;
            true
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_and_insert() {
        let mut cache = CycleCache::<(u32, bool)>::new(2);
        assert!(!cache.seen((1, false)));
        assert!(!cache.seen((1, true)));
        assert!(cache.seen((1, false)));
        assert!(cache.contains(&(1, true)));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut cache = CycleCache::<u64>::default();
        cache.seen(42);
        cache.seen(42);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
        assert!(!cache.seen(42));
    }

    #[test]
    fn test_no_collisions() {
        let mut cache = CycleCache::<u64>::new(2);
        for i in 0..1000 {
            assert!(!cache.seen(i));
        }
        for i in 0..1000 {
            assert!(cache.seen(i));
        }
        assert_eq!(cache.hits(), 1000);
    }
}
