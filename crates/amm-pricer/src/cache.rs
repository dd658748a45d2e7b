//! Caching for computed prices.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use alloy_primitives::Address;
use lru::LruCache;

/// Cache key for a price: (router, token_in, block, token_out). `block = None` is latest.
#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub struct PriceCacheKey {
    pub router: Address,
    pub token_in: Address,
    pub block: Option<u64>,
    pub token_out: Address,
}

/// Snapshot of cache hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// LRU price cache. Entries pinned to a block never go stale; latest-block entries expire
/// after `max_age`.
pub struct PriceCache {
    prices: LruCache<PriceCacheKey, (f64, Instant)>,
    max_age: Duration,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl PriceCache {
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            prices: LruCache::new(capacity),
            max_age,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn is_stale(&self, key: &PriceCacheKey, stored: Instant) -> bool {
        key.block.is_none() && stored.elapsed() >= self.max_age
    }

    /// Get a cached price if present and not expired.
    pub fn get(&mut self, key: &PriceCacheKey) -> Option<f64> {
        let is_expired = match self.prices.peek(key) {
            Some((_, ts)) => self.is_stale(key, *ts),
            None => false,
        };

        if is_expired {
            self.prices.pop(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        if let Some((price, _)) = self.prices.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(*price)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn insert(&mut self, key: PriceCacheKey, price: f64) {
        self.prices.put(key, (price, Instant::now()));
    }

    /// Remove expired entries
    pub fn purge_expired(&mut self) {
        let keys_to_remove: Vec<_> = self
            .prices
            .iter()
            .filter(|(k, v)| self.is_stale(k, v.1))
            .map(|(k, _)| *k)
            .collect();
        for k in keys_to_remove {
            self.prices.pop(&k);
        }
    }

    /// Drop every entry computed through `router`.
    pub fn invalidate_router(&mut self, router: &Address) {
        let keys_to_remove: Vec<_> =
            self.prices.iter().filter(|(k, _)| &k.router == router).map(|(k, _)| *k).collect();
        for k in keys_to_remove {
            self.prices.pop(&k);
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Retrieve current cache metrics snapshot.
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.prices.len(),
        }
    }
}
