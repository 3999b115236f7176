//! Resolution cache with per-entry freshness windows
//!
//! Stores resolved values by [`ResolutionKey`] so repeated lookups skip the
//! upstream. Entries older than their freshness window are treated as misses
//! and removed on read; [`ResolutionCache::purge_expired`] sweeps the rest.
//! The map is split into shards, each behind its own mutex, and no lock is
//! ever held across an `.await`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use marquee_core::CacheConfig;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::types::ResolutionKey;

/// Cached value with the metadata needed to judge its freshness.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Key the value was stored under
    pub key: ResolutionKey,
    /// The cached value
    pub value: V,
    /// When the value was stored
    pub created_at: Instant,
    /// How long the value counts as fresh
    pub freshness_window: Duration,
}

impl<V> CacheEntry<V> {
    /// Wraps `value`, stamping it with the current time.
    pub fn new(key: ResolutionKey, value: V, freshness_window: Duration) -> Self {
        Self {
            key,
            value,
            created_at: Instant::now(),
            freshness_window,
        }
    }

    /// Time elapsed since the value was stored.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// An entry is stale once its age exceeds the window.
    pub fn is_expired(&self) -> bool {
        self.age() > self.freshness_window
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStatistics {
    /// Entries currently held, stale ones included
    pub entries: usize,
    /// Maximum entries across all shards
    pub capacity: usize,
    /// Lookups answered from the cache
    pub hit_count: u64,
    /// Lookups that found nothing or only a stale entry
    pub miss_count: u64,
    /// Entries dropped for being stale
    pub expired_count: u64,
    /// Hits over total lookups, in `[0, 1]`
    pub hit_rate: f64,
}

impl CacheStatistics {
    /// Fraction of lookups that were hits, `0.0` before any lookup.
    pub fn calculate_hit_rate(hit_count: u64, miss_count: u64) -> f64 {
        if hit_count + miss_count == 0 {
            0.0
        } else {
            (hit_count as f64) / ((hit_count + miss_count) as f64)
        }
    }
}

/// Sharded LRU store mapping resolution keys to values of one type.
#[derive(Debug)]
pub struct ResolutionCache<V> {
    name: &'static str,
    shards: Vec<Mutex<LruCache<ResolutionKey, CacheEntry<V>>>>,
    freshness_window: Duration,
    capacity_per_shard: NonZeroUsize,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    expired_count: AtomicU64,
}

impl<V: Clone> ResolutionCache<V> {
    /// Creates a cache whose entries stay fresh for `freshness_window`.
    ///
    /// Shard count and per-shard capacity come from `config`; zero values
    /// are raised to one.
    pub fn new(name: &'static str, freshness_window: Duration, config: &CacheConfig) -> Self {
        let capacity_per_shard =
            NonZeroUsize::new(config.max_entries_per_shard).unwrap_or(NonZeroUsize::MIN);
        let shards = (0..config.shards.max(1))
            .map(|_| Mutex::new(LruCache::new(capacity_per_shard)))
            .collect();

        Self {
            name,
            shards,
            freshness_window,
            capacity_per_shard,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Label used in log lines.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How long a stored value counts as fresh.
    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    fn shard(&self, key: &ResolutionKey) -> &Mutex<LruCache<ResolutionKey, CacheEntry<V>>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Returns a clone of the fresh value for `key`, if any.
    ///
    /// A stale entry is removed and reported as a miss.
    pub fn get(&self, key: &ResolutionKey) -> Option<V> {
        let mut shard = self.shard(key).lock();

        let stale_age = match shard.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("{} cache hit for {}", self.name, key);
                return Some(entry.value.clone());
            }
            Some(entry) => Some(entry.age()),
            None => None,
        };

        match stale_age {
            Some(age) => {
                shard.pop(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("{} cache entry for {} expired after {:?}", self.name, key, age);
            }
            None => tracing::debug!("{} cache miss for {}", self.name, key),
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The least recently used entry of the shard is evicted when full.
    pub fn put(&self, key: ResolutionKey, value: V) {
        let entry = CacheEntry::new(key.clone(), value, self.freshness_window);
        let displaced = self.shard(&key).lock().push(key.clone(), entry);

        // push() also hands back the replaced entry for the same key
        if let Some((old_key, _)) = displaced
            && old_key != key
        {
            tracing::debug!("{} cache evicted {}", self.name, old_key);
        }
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    /// Removes all stale entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = shard.lock();
            let stale: Vec<ResolutionKey> = shard
                .iter()
                .filter(|(_, entry)| entry.is_expired())
                .map(|(key, _)| key.clone())
                .collect();
            for key in &stale {
                shard.pop(key);
            }
            removed += stale.len();
        }

        if removed > 0 {
            self.expired_count
                .fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!("{} cache purged {} expired entries", self.name, removed);
        }
        removed
    }

    /// Entries currently held across all shards, stale ones included.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Whether no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the hit, miss and expiry counters.
    pub fn statistics(&self) -> CacheStatistics {
        let hit_count = self.hit_count.load(Ordering::Relaxed);
        let miss_count = self.miss_count.load(Ordering::Relaxed);

        CacheStatistics {
            entries: self.len(),
            capacity: self.capacity_per_shard.get() * self.shards.len(),
            hit_count,
            miss_count,
            expired_count: self.expired_count.load(Ordering::Relaxed),
            hit_rate: CacheStatistics::calculate_hit_rate(hit_count, miss_count),
        }
    }
}
