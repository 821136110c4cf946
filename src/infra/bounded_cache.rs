use crate::domain_port::{Cache, CacheEntry, CacheError, CacheIter, CacheStats};
use crate::logger::*;
use moka::Expiry;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Bookkeeping bytes charged per entry on top of key and value.
pub const ENTRY_OVERHEAD: usize = 48;

pub const DEFAULT_CAPACITY_BYTES: usize = 100 * 1024 * 1024;

/// Longest TTL handed to the cache; longer ones are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct Stored {
    value: Vec<u8>,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

fn entry_cost(key: &[u8], value: &[u8]) -> usize {
    key.len() + value.len() + ENTRY_OVERHEAD
}

struct PerEntryTtl;

impl Expiry<Vec<u8>, Arc<Stored>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &Vec<u8>,
        value: &Arc<Stored>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &Vec<u8>,
        value: &Arc<Stored>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process [`Cache`] bounded by a byte budget, backed by `moka`.
///
/// Entries are weighed as key + value + [`ENTRY_OVERHEAD`] and evicted in
/// least-recently-used order once the budget is exceeded. Expired entries
/// read as absent and are dropped by moka's housekeeping or
/// [`BoundedCache::purge_expired`].
pub struct BoundedCache {
    capacity: usize,
    inner: moka::sync::Cache<Vec<u8>, Arc<Stored>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl BoundedCache {
    pub fn new(capacity_bytes: usize) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let evicted = evictions.clone();

        let inner = moka::sync::Cache::builder()
            .max_capacity(capacity_bytes as u64)
            .weigher(|key: &Vec<u8>, stored: &Arc<Stored>| {
                u32::try_from(entry_cost(key, &stored.value)).unwrap_or(u32::MAX)
            })
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(PerEntryTtl)
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Size {
                    let total = evicted.fetch_add(1, Ordering::Relaxed) + 1;
                    trace!(evictions = total, "cache evicted entry");
                }
            })
            .build();

        BoundedCache {
            capacity: capacity_bytes,
            inner,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
        }
    }

    /// Runs moka's pending housekeeping, which drops expired entries.
    pub fn purge_expired(&self) {
        self.inner.run_pending_tasks();
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for BoundedCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_BYTES)
    }
}

impl Cache for BoundedCache {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, CacheError> {
        let now = Instant::now();
        let found = self
            .inner
            .get(key)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.value.clone());
        self.record(found.is_some());
        found.ok_or(CacheError::NotFound)
    }

    fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError> {
        let cost = entry_cost(key, value);
        if cost > self.capacity {
            return Err(CacheError::EntryTooLarge {
                size: cost,
                capacity: self.capacity,
            });
        }

        let ttl = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| ttl.min(MAX_TTL));
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.inner.insert(
            key.to_vec(),
            Arc::new(Stored {
                value: value.to_vec(),
                ttl,
                expires_at,
            }),
        );
        Ok(())
    }

    fn del(&self, key: &[u8]) -> bool {
        let now = Instant::now();
        self.inner
            .remove(key)
            .is_some_and(|stored| !stored.is_expired(now))
    }

    fn take(&self, key: &[u8]) -> Result<Vec<u8>, CacheError> {
        let now = Instant::now();
        let taken = self
            .inner
            .remove(key)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.value.clone());
        self.record(taken.is_some());
        taken.ok_or(CacheError::NotFound)
    }

    fn iter(&self) -> CacheIter {
        let now = Instant::now();
        let entries = self
            .inner
            .iter()
            .filter(|(_, stored)| !stored.is_expired(now))
            .map(|(key, stored)| CacheEntry {
                key: Vec::clone(&key),
                value: stored.value.clone(),
            })
            .collect();
        CacheIter::new(entries)
    }

    fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entries: self.inner.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            used_bytes: self.inner.weighted_size(),
            capacity_bytes: self.capacity as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const VALUE: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
        Nulla id tincidunt urna. Proin auctor pretium ornare.";

    #[test]
    fn set_get_del_and_counters() {
        let cache = BoundedCache::default();

        cache.set(b"Lorem ipsum", VALUE, None).unwrap();
        assert_eq!(cache.entry_count(), 1);

        assert_eq!(cache.get(b"Lorem ipsum").unwrap(), VALUE);
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.miss_count(), 0);

        assert_eq!(cache.get(b"invalid key"), Err(CacheError::NotFound));
        assert_eq!(cache.miss_count(), 1);
        assert_eq!(cache.hit_count(), 1);

        assert!(cache.del(b"Lorem ipsum"));
        assert!(!cache.del(b"invalid key"));
        assert!(!cache.del(b"Lorem ipsum"));
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.stats().used_bytes, 0);

        // set and del do not touch hit/miss
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.miss_count(), 1);
    }

    #[test]
    fn overwrite_replaces_value_and_accounting() {
        let cache = BoundedCache::new(1024);
        cache.set(b"k", b"first", None).unwrap();
        cache.set(b"k", b"second value", None).unwrap();

        assert_eq!(cache.get(b"k").unwrap(), b"second value");
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(
            cache.stats().used_bytes as usize,
            entry_cost(b"k", b"second value")
        );
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn entry_larger_than_capacity_is_rejected() {
        let cache = BoundedCache::new(64);
        let err = cache.set(b"k", &[0u8; 64], None).unwrap_err();
        assert!(matches!(err, CacheError::EntryTooLarge { capacity: 64, .. }));
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn filling_past_capacity_plateaus() {
        let capacity = 16 * 1024;
        let cache = BoundedCache::new(capacity);
        let per_entry = entry_cost(b"key-00000", VALUE);
        let bound = (capacity / per_entry) as u64;

        for i in 0..10_000 {
            let key = format!("key-{i:05}");
            cache.set(key.as_bytes(), VALUE, None).unwrap();
            if i % 100 == 0 {
                assert!(cache.entry_count() <= bound);
            }
        }

        let stats = cache.stats();
        assert_eq!(stats.entries, bound);
        assert!(stats.used_bytes <= capacity as u64);
        assert!(stats.evictions > 0);
        assert!(cache.get(b"key-09999").is_ok());
        assert!(cache.get(b"key-00000").is_err());
    }

    #[test]
    fn eviction_follows_recency() {
        let per_entry = entry_cost(b"a", b"value");
        let cache = BoundedCache::new(per_entry * 3);

        cache.set(b"a", b"value", None).unwrap();
        cache.set(b"b", b"value", None).unwrap();
        cache.set(b"c", b"value", None).unwrap();
        cache.purge_expired();
        cache.get(b"a").unwrap();
        cache.purge_expired();
        cache.set(b"d", b"value", None).unwrap();
        assert_eq!(cache.entry_count(), 3);

        assert!(cache.get(b"b").is_err());
        for key in [b"a", b"c", b"d"] {
            assert!(cache.get(key).is_ok());
        }
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn expired_entries_behave_as_absent() {
        let cache = BoundedCache::default();
        cache
            .set(b"short", b"v", Some(Duration::from_millis(30)))
            .unwrap();
        cache.set(b"zero", b"v", Some(Duration::ZERO)).unwrap();
        assert!(cache.get(b"short").is_ok());

        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.get(b"short"), Err(CacheError::NotFound));
        assert!(!cache.del(b"short"));
        assert!(cache.get(b"zero").is_ok());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn overwrite_resets_ttl() {
        let cache = BoundedCache::default();
        cache
            .set(b"k", b"v", Some(Duration::from_millis(20)))
            .unwrap();
        cache.set(b"k", b"v", None).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get(b"k").is_ok());
    }

    #[test]
    fn huge_ttl_is_accepted() {
        let cache = BoundedCache::default();
        cache
            .set(b"k", b"v", Some(Duration::from_secs(u64::MAX)))
            .unwrap();
        assert_eq!(cache.get(b"k").unwrap(), b"v");
    }

    #[test]
    fn purge_drops_only_expired() {
        let cache = BoundedCache::default();
        cache
            .set(b"gone", b"v", Some(Duration::from_millis(10)))
            .unwrap();
        cache.set(b"kept", b"v", None).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        cache.purge_expired();
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.iter().count(), 1);
    }

    #[test]
    fn take_is_single_use() {
        let cache = BoundedCache::default();
        cache.set(b"rt", b"identity", None).unwrap();

        assert_eq!(cache.take(b"rt").unwrap(), b"identity");
        assert_eq!(cache.take(b"rt"), Err(CacheError::NotFound));
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.miss_count(), 1);
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn expired_entry_cannot_be_taken() {
        let cache = BoundedCache::default();
        cache
            .set(b"rt", b"identity", Some(Duration::from_millis(10)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.take(b"rt"), Err(CacheError::NotFound));
        assert_eq!(cache.miss_count(), 1);
    }

    #[test]
    fn concurrent_take_has_one_winner() {
        let cache = Arc::new(BoundedCache::default());
        cache.set(b"rt", b"identity", None).unwrap();
        let winners = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|s| {
            for _ in 0..16 {
                let cache = cache.clone();
                let winners = winners.clone();
                s.spawn(move || {
                    if cache.take(b"rt").is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn iterator_is_a_snapshot() {
        let cache = BoundedCache::default();
        cache.set(b"a", b"1", None).unwrap();
        cache.set(b"b", b"2", None).unwrap();

        let mut iter = cache.iter();
        cache.set(b"c", b"3", None).unwrap();
        assert!(cache.del(b"a"));

        let mut keys: Vec<Vec<u8>> = iter.by_ref().map(|e| e.key).collect();
        keys.sort();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);

        iter.rewind();
        assert_eq!(iter.count(), 2);
        assert_eq!(cache.iter().count(), 2);
    }
}
