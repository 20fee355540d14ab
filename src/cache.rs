//! Shared embedding cache
//!
//! Content-addressed cache of computed embeddings, shared by every
//! `analyze` call on one engine instance. The cache is the only mutable
//! state in the pipeline, so its discipline carries the engine's
//! concurrency guarantees:
//!
//! - reads are lock-free shard reads returning `Arc` clones, so eviction
//!   can never invalidate an embedding an in-flight call still holds
//! - insertion is first-writer-wins; a concurrent identical insertion is
//!   an idempotent no-op
//! - the optional capacity bound evicts the least-recently-used entry and
//!   is handled entirely internally

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::models::Embedding;

struct CacheSlot {
    value: Arc<Embedding>,
    /// Monotonic stamp of the most recent access
    touched: AtomicU64,
}

/// Thread-safe, optionally bounded embedding cache keyed by content hash.
pub struct EmbeddingCache {
    slots: DashMap<String, CacheSlot>,
    capacity: Option<usize>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    /// Cache without a capacity bound (the default).
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Cache bounded to `capacity` entries with LRU eviction.
    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            slots: DashMap::new(),
            capacity,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up an embedding by content hash.
    pub fn get(&self, hash: &str) -> Option<Arc<Embedding>> {
        let slot = self.slots.get(hash)?;
        slot.touched.store(self.tick(), Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(Arc::clone(&slot.value))
    }

    /// Return the cached embedding for `hash`, computing and inserting it
    /// on a miss. When two threads miss on the same key concurrently, both
    /// may compute but only the first insertion is kept, so every caller
    /// observes the same committed value.
    pub fn get_or_insert_with<F>(&self, hash: &str, compute: F) -> Arc<Embedding>
    where
        F: FnOnce() -> Embedding,
    {
        if let Some(found) = self.get(hash) {
            return found;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(compute());
        let slot = self.slots.entry(hash.to_string()).or_insert_with(|| CacheSlot {
            value: Arc::clone(&value),
            touched: AtomicU64::new(self.tick()),
        });
        let committed = Arc::clone(&slot.value);
        drop(slot);

        self.evict_over_capacity();
        committed
    }

    /// Evict least-recently-used entries until the cache fits its bound.
    fn evict_over_capacity(&self) {
        let Some(capacity) = self.capacity else {
            return;
        };

        while self.slots.len() > capacity {
            // Snapshot stamps instead of holding map guards across the
            // removal; concurrent inserts are caught by the outer loop.
            let mut entries: Vec<(String, u64)> = self
                .slots
                .iter()
                .map(|slot| (slot.key().clone(), slot.touched.load(Ordering::Relaxed)))
                .collect();
            if entries.is_empty() {
                break;
            }
            entries.sort_by_key(|(_, touched)| *touched);

            let excess = self.slots.len().saturating_sub(capacity).max(1);
            for (key, _) in entries.into_iter().take(excess) {
                // Readers holding the Arc keep the value alive; only the
                // cache's reference is dropped here.
                self.slots.remove(&key);
                debug!("evicted embedding {key} (capacity {capacity})");
            }
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// (hits, misses) counters since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::FeatureVector;

    fn embedding(hash: &str) -> Embedding {
        Embedding {
            hash: hash.to_string(),
            dim: 4,
            vector: vec![1.0, 0.0, 0.0, 0.0],
            features: FeatureVector::default(),
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = EmbeddingCache::unbounded();
        assert!(cache.get("a").is_none());
        cache.get_or_insert_with("a", || embedding("a"));
        assert!(cache.get("a").is_some());
        let (hits, misses) = cache.stats();
        assert_eq!(misses, 1);
        assert!(hits >= 1);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let cache = EmbeddingCache::unbounded();
        let first = cache.get_or_insert_with("k", || embedding("k"));
        let second = cache.get_or_insert_with("k", || panic!("must not recompute on hit"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction_respects_capacity() {
        let cache = EmbeddingCache::bounded(2);
        cache.get_or_insert_with("a", || embedding("a"));
        cache.get_or_insert_with("b", || embedding("b"));
        // Touch "a" so "b" becomes the LRU entry
        cache.get("a");
        cache.get_or_insert_with("c", || embedding("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_evicted_entry_stays_usable_for_holder() {
        let cache = EmbeddingCache::bounded(1);
        let held = cache.get_or_insert_with("a", || embedding("a"));
        cache.get_or_insert_with("b", || embedding("b"));
        // "a" was evicted from the cache but the held Arc is intact
        assert!(cache.get("a").is_none());
        assert_eq!(held.hash, "a");
        assert_eq!(held.vector[0], 1.0);
    }
}
