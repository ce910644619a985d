//! Memoization of lookahead counts.
//!
//! A cache belongs to exactly one packing session. Counts computed against one queue of
//! upcoming items are meaningless for another, so sessions never share a cache and callers
//! must [`LookaheadCache::clear`] it before reusing a session for an unrelated run.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::geometry::RemainingSpace;
use crate::model::Item;
use crate::types::{Dimensions, Rotation};

/// The parts of an upcoming item that influence the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemSignature {
    pub dims: Dimensions,
    pub weight: u32,
    pub rotation: Rotation,
}

impl From<&Item> for ItemSignature {
    fn from(item: &Item) -> Self {
        Self {
            dims: item.dims,
            weight: item.weight,
            rotation: item.allowed_rotation,
        }
    }
}

/// Canonical description of one lookahead evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookaheadKey {
    orientation: Dimensions,
    space: RemainingSpace,
    sample: Vec<ItemSignature>,
    limit: usize,
}

impl LookaheadKey {
    /// Builds the key; only the first `limit` sampled items take part.
    pub fn new(
        orientation: Dimensions,
        space: &RemainingSpace,
        sample: &[Item],
        limit: usize,
    ) -> Self {
        Self {
            orientation,
            space: *space,
            sample: sample.iter().take(limit).map(ItemSignature::from).collect(),
            limit,
        }
    }
}

/// Hit and miss counters of a cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe cache of lookahead counts.
///
/// Backed by a sharded map: readers never block each other and a miss only locks the
/// shard its key hashes to. Two threads missing on the same key both compute; since the
/// computation is pure they write the same value.
#[derive(Debug, Default)]
pub struct LookaheadCache {
    entries: DashMap<LookaheadKey, usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LookaheadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached count without computing anything.
    pub fn get(&self, key: &LookaheadKey) -> Option<usize> {
        let value = self.entries.get(key).map(|entry| *entry);
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    /// Returns the cached count or computes, stores and returns it.
    pub fn get_or_compute<F>(&self, key: LookaheadKey, compute: F) -> usize
    where
        F: FnOnce() -> usize,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        // Compute outside of any shard lock.
        let value = compute();
        self.entries.insert(key, value);
        value
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but recomputes on a hit and replaces
    /// the entry if the stored count disagrees.
    pub fn get_or_compute_verified<F>(&self, key: LookaheadKey, compute: F) -> usize
    where
        F: Fn() -> usize,
    {
        let Some(cached) = self.get(&key) else {
            let value = compute();
            self.entries.insert(key, value);
            return value;
        };

        let fresh = compute();
        if fresh != cached {
            log::warn!(
                "Discarding inconsistent lookahead cache entry for {:?} (cached {}, recomputed {})",
                key.orientation,
                cached,
                fresh
            );
            self.entries.insert(key, fresh);
        }
        fresh
    }

    /// Stores a count, replacing any previous value.
    pub fn insert(&self, key: LookaheadKey, value: usize) {
        self.entries.insert(key, value);
    }

    /// Removes all entries and resets the counters.
    pub fn clear(&self) {
        log::debug!("Clearing lookahead cache ({} entries)", self.entries.len());
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
