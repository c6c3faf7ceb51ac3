//! Bounded TTL cache for query results.
//!
//! One entry per cache key, overwritten on every fresh fetch and lazily
//! dropped on read once expired. Invalidation is by exact key; there is no
//! prefix or tag fan-out here.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::store::Document;

/// A cached result set with its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Vec<Document>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// A read at `t >= expires_at` must refetch.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub hit_rate: f64,
}

/// TTL cache keyed by the strings in [`super::key`].
pub struct QueryCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Create a cache with the given default TTL in seconds.
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl: Duration::seconds(default_ttl_secs as i64),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Read a non-expired entry. An expired entry is removed and counts as a
    /// miss.
    pub fn get(&self, key: &str) -> Option<Vec<Document>> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let data = entry.data.clone();
                drop(entry);
                self.hits.fetch_add(1, Ordering::Relaxed);
                counter!("sync_cache_hits_total").increment(1);
                Some(data)
            }
            Some(entry) => {
                drop(entry);
                self.entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                counter!("sync_cache_misses_total", "reason" => "expired").increment(1);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                counter!("sync_cache_misses_total", "reason" => "not_found").increment(1);
                None
            }
        }
    }

    /// Store a result set under the default TTL, overwriting any previous
    /// entry.
    pub fn insert(&self, key: &str, data: Vec<Document>) {
        self.insert_with_ttl(key, data, self.default_ttl);
    }

    /// Store a result set with an explicit TTL.
    pub fn insert_with_ttl(&self, key: &str, data: Vec<Document>, ttl: Duration) {
        let now = Utc::now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                cached_at: now,
                expires_at: now + ttl,
            },
        );
        counter!("sync_cache_sets_total").increment(1);
        gauge!("sync_cache_entries").set(self.entries.len() as f64);
    }

    /// Drop a single entry. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            counter!("sync_cache_invalidations_total").increment(1);
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
        gauge!("sync_cache_entries").set(0.0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key currently holds a non-expired entry, without touching
    /// hit/miss counters.
    pub fn contains_fresh(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|e| !e.is_expired())
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            entries: self.entries.len(),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
