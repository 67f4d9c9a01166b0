//! In-process LRU cache with per-entry TTL, sharded by fingerprint prefix.
//!
//! Eviction:
//! 1. TTL — an expired entry is dropped when it is next looked up.
//! 2. LRU — inserting a new fingerprint at capacity evicts the least-recently-used entry first.
//!
//! Each shard is its own `Mutex<LruCache>`, so fingerprints in different
//! shards never contend. Recency is a global tick stamped under the shard
//! lock, which keeps every shard's LRU tail its oldest entry; the global LRU
//! entry is the oldest of those tails. No lock is held across an `.await` and
//! at most one shard lock is held at a time.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{AnalysisCache, CacheError, CacheStats};
use crate::models::AnalysisResult;
use crate::pipeline::fingerprint::Fingerprint;

const SHARDS: usize = 16;

type Shard = Mutex<LruCache<Fingerprint, CacheEntry>>;

struct CacheEntry {
    fingerprint: Fingerprint,
    result: Arc<AnalysisResult>,
    created_at: Instant,
    last_used: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }
}

#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

pub struct InMemoryCache {
    shards: Vec<Shard>,
    len: AtomicUsize,
    clock: AtomicU64,
    capacity: NonZeroUsize,
    ttl: Duration,
    metrics: CacheMetrics,
}

impl InMemoryCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(LruCache::unbounded())).collect(),
            len: AtomicUsize::new(0),
            clock: AtomicU64::new(0),
            capacity,
            ttl,
            metrics: CacheMetrics::default(),
        }
    }

    fn shard_index(fp: &Fingerprint) -> usize {
        fp.prefix() as usize % SHARDS
    }

    fn lock(&self, index: usize) -> Result<MutexGuard<'_, LruCache<Fingerprint, CacheEntry>>, CacheError> {
        self.shards[index].lock().map_err(|_| CacheError::Poisoned)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn release_slot(&self) {
        self.len.fetch_sub(1, Ordering::Relaxed);
    }

    /// Pops the entry with the oldest tick across all shards.
    fn evict_lru(&self) -> Result<(), CacheError> {
        let mut oldest: Option<(usize, u64)> = None;
        for index in 0..SHARDS {
            let shard = self.lock(index)?;
            if let Some((_, entry)) = shard.peek_lru() {
                if oldest.map_or(true, |(_, tick)| entry.last_used < tick) {
                    oldest = Some((index, entry.last_used));
                }
            }
        }

        if let Some((index, _)) = oldest {
            let popped = self.lock(index)?.pop_lru();
            if let Some((_, evicted)) = popped {
                debug!("Cache at capacity; evicted LRU entry {}", evicted.fingerprint);
                self.release_slot();
                Self::record(&self.metrics.evictions);
            }
        }
        Ok(())
    }

    fn insert_new(
        &self,
        index: usize,
        fp: Fingerprint,
        result: Arc<AnalysisResult>,
        reserved: usize,
    ) -> Result<(), CacheError> {
        if reserved >= self.capacity.get() {
            self.evict_lru()?;
        }

        let mut shard = self.lock(index)?;
        let entry = CacheEntry {
            fingerprint: fp,
            result,
            created_at: Instant::now(),
            last_used: self.tick(),
        };
        if shard.put(fp, entry).is_some() {
            // A racing writer inserted the same fingerprint first.
            self.release_slot();
        }
        Ok(())
    }
}

#[async_trait]
impl AnalysisCache for InMemoryCache {
    async fn get(&self, fp: &Fingerprint) -> Result<Option<Arc<AnalysisResult>>, CacheError> {
        let now = Instant::now();
        let mut shard = self.lock(Self::shard_index(fp))?;

        let lookup = match shard.get_mut(fp) {
            Some(entry) if entry.is_expired(now, self.ttl) => Some(None),
            Some(entry) => {
                entry.last_used = self.tick();
                Some(Some(Arc::clone(&entry.result)))
            }
            None => None,
        };

        match lookup {
            Some(Some(result)) => {
                Self::record(&self.metrics.hits);
                Ok(Some(result))
            }
            Some(None) => {
                shard.pop(fp);
                self.release_slot();
                debug!("Cache entry {fp} expired");
                Self::record(&self.metrics.evictions);
                Self::record(&self.metrics.misses);
                Ok(None)
            }
            None => {
                Self::record(&self.metrics.misses);
                Ok(None)
            }
        }
    }

    async fn put(&self, fp: Fingerprint, result: Arc<AnalysisResult>) -> Result<(), CacheError> {
        let index = Self::shard_index(&fp);

        // Overwrite in place: no slot is taken, so nothing is evicted.
        {
            let mut shard = self.lock(index)?;
            if let Some(entry) = shard.get_mut(&fp) {
                entry.result = result;
                entry.created_at = Instant::now();
                entry.last_used = self.tick();
                return Ok(());
            }
        }

        // Reserve a slot first so concurrent inserts cannot overshoot capacity
        // by more than the number of racing writers.
        let reserved = self.len.fetch_add(1, Ordering::Relaxed);
        let inserted = self.insert_new(index, fp, result, reserved);
        if inserted.is_err() {
            self.release_slot();
        }
        inserted
    }

    async fn invalidate(&self, fp: &Fingerprint) -> Result<bool, CacheError> {
        let removed = self.lock(Self::shard_index(fp))?.pop(fp).is_some();
        if removed {
            self.release_slot();
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats {
            backend: "memory",
            entries: Some(self.len.load(Ordering::Relaxed)),
            capacity: Some(self.capacity.get()),
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            evictions: self.metrics.evictions.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedContent, FinalScore, Suggestions};
    use crate::pipeline::fingerprint::fingerprint;
    use chrono::Utc;

    fn fp(n: usize) -> Fingerprint {
        fingerprint(&ExtractedContent {
            text: format!("resume {n}"),
            ..ExtractedContent::default()
        })
    }

    fn result_for(fp: Fingerprint) -> Arc<AnalysisResult> {
        Arc::new(AnalysisResult {
            fingerprint: fp,
            score: FinalScore::zero(),
            suggestions: Suggestions::default(),
            analyzers: vec![],
            complete: false,
            analyzed_at: Utc::now(),
        })
    }

    fn cache(capacity: usize, ttl_secs: u64) -> InMemoryCache {
        InMemoryCache::new(
            NonZeroUsize::new(capacity).unwrap(),
            Duration::from_secs(ttl_secs),
        )
    }

    #[tokio::test]
    async fn test_miss_is_ok_none() {
        let cache = cache(2, 60);
        assert!(cache.get(&fp(1)).await.unwrap().is_none());
        assert_eq!(cache.stats().await.unwrap().misses, 1);
    }

    #[tokio::test]
    async fn test_put_then_get_returns_same_result() {
        let cache = cache(2, 60);
        let result = result_for(fp(1));
        cache.put(fp(1), Arc::clone(&result)).await.unwrap();

        let cached = cache.get(&fp(1)).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&cached, &result));
        assert_eq!(cache.stats().await.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_capacity_plus_one_evicts_exactly_lru() {
        let cache = cache(3, 60);
        for n in 0..3 {
            cache.put(fp(n), result_for(fp(n))).await.unwrap();
        }
        // Touch fp(0) so fp(1) becomes least recently used.
        assert!(cache.get(&fp(0)).await.unwrap().is_some());

        cache.put(fp(3), result_for(fp(3))).await.unwrap();

        assert!(cache.get(&fp(1)).await.unwrap().is_none());
        for n in [0, 2, 3] {
            assert!(cache.get(&fp(n)).await.unwrap().is_some(), "fp({n}) should survive");
        }
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, Some(3));
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = cache(2, 60);
        cache.put(fp(0), result_for(fp(0))).await.unwrap();
        cache.put(fp(1), result_for(fp(1))).await.unwrap();
        cache.put(fp(0), result_for(fp(0))).await.unwrap();

        assert!(cache.get(&fp(1)).await.unwrap().is_some());
        assert_eq!(cache.stats().await.unwrap().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = cache(4, 10);
        cache.put(fp(1), result_for(fp(1))).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get(&fp(1)).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&fp(1)).await.unwrap().is_none());
        assert_eq!(cache.stats().await.unwrap().entries, Some(0));
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = cache(2, 60);
        cache.put(fp(1), result_for(fp(1))).await.unwrap();
        assert!(cache.invalidate(&fp(1)).await.unwrap());
        assert!(!cache.invalidate(&fp(1)).await.unwrap());
        assert!(cache.get(&fp(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_puts_on_distinct_fingerprints() {
        let cache = Arc::new(cache(64, 60));
        let mut handles = Vec::new();
        for n in 0..32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.put(fp(n), result_for(fp(n))).await.unwrap();
                cache.get(&fp(n)).await.unwrap().is_some()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(cache.stats().await.unwrap().entries, Some(32));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_get_on_same_fingerprint() {
        let cache = Arc::new(cache(4, 60));
        let key = fp(7);
        let mut handles = Vec::new();
        for n in 0..64 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                if n % 2 == 0 {
                    cache.put(key, result_for(key)).await.unwrap();
                    None
                } else {
                    cache.get(&key).await.unwrap()
                }
            }));
        }
        for handle in handles {
            if let Some(seen) = handle.await.unwrap() {
                assert_eq!(seen.fingerprint, key);
            }
        }
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, Some(1));
        assert_eq!(stats.evictions, 0);
        assert!(cache.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lru_order_holds_across_shards() {
        let cache = cache(8, 60);
        for n in 0..8 {
            cache.put(fp(n), result_for(fp(n))).await.unwrap();
        }
        // Recency is now 7, 6, ..., 0 from oldest to newest.
        for n in (0..8).rev() {
            assert!(cache.get(&fp(n)).await.unwrap().is_some());
        }

        for (inserted, evicted) in (100..104).zip([7, 6, 5, 4]) {
            cache.put(fp(inserted), result_for(fp(inserted))).await.unwrap();
            assert!(cache.get(&fp(evicted)).await.unwrap().is_none(), "fp({evicted}) should be evicted");
        }
        for n in 0..4 {
            assert!(cache.get(&fp(n)).await.unwrap().is_some(), "fp({n}) should survive");
        }
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, Some(8));
        assert_eq!(stats.evictions, 4);
    }

    #[tokio::test]
    async fn test_held_shard_does_not_block_other_fingerprints() {
        let cache = cache(8, 60);
        let busy = fp(0);
        let other = (1..)
            .map(fp)
            .find(|candidate| InMemoryCache::shard_index(candidate) != InMemoryCache::shard_index(&busy))
            .unwrap();

        let _held = cache.shards[InMemoryCache::shard_index(&busy)].lock().unwrap();
        cache.put(other, result_for(other)).await.unwrap();
        assert!(cache.get(&other).await.unwrap().is_some());
    }
}
