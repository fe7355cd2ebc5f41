//! Memoizing decorator for similarity providers.
//!
//! The table builder probes the same leaf pairs many times across DP levels;
//! wrapping a provider in [`CachedProvider`] trades bounded memory for
//! avoiding recomputation. Keys are canonicalized to `(min, max)` so the two
//! orientations of a pair share one slot. Occupancy is bounded by an LRU
//! usage list; the coldest entry is evicted at capacity.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use lru::LruCache;

use crate::provider::{ProviderError, SimilarityProvider};
use crate::tree::LeafId;

/// Configuration for [`CachedProvider`].
///
/// # Examples
/// ```
/// use engawa_core::CacheConfig;
/// use std::num::NonZeroUsize;
///
/// let config = CacheConfig::default()
///     .with_max_entries(NonZeroUsize::new(512).unwrap());
/// assert_eq!(config.max_entries().get(), 512);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    max_entries: NonZeroUsize,
}

impl CacheConfig {
    /// Default maximum number of cached pairs retained before eviction.
    pub const DEFAULT_MAX_ENTRIES: usize = 1_048_576;

    /// Builds a configuration with the provided maximum capacity.
    #[must_use]
    pub fn new(max_entries: NonZeroUsize) -> Self {
        Self { max_entries }
    }

    /// Updates the maximum number of cached pairs retained before eviction.
    #[must_use]
    pub fn with_max_entries(mut self, max: NonZeroUsize) -> Self {
        self.max_entries = max;
        self
    }

    /// Returns the maximum number of cached pairs retained before eviction.
    #[must_use]
    pub fn max_entries(&self) -> NonZeroUsize {
        self.max_entries
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let max_entries = NonZeroUsize::new(Self::DEFAULT_MAX_ENTRIES)
            .expect("default cache size must be non-zero");
        Self::new(max_entries)
    }
}

fn canonical_key(a: LeafId, b: LeafId) -> (LeafId, LeafId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// A [`SimilarityProvider`] decorator that memoizes pair lookups.
///
/// # Examples
/// ```
/// use engawa_core::{CachedProvider, LeafId, ProviderError, SimilarityProvider};
///
/// struct Ruler(Vec<f64>);
///
/// impl SimilarityProvider for Ruler {
///     fn name(&self) -> &str { "ruler" }
///     fn len(&self) -> usize { self.0.len() }
///     fn contains(&self, id: LeafId) -> bool { (id.get() as usize) < self.0.len() }
///     fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError> {
///         Ok((self.0[a.get() as usize] - self.0[b.get() as usize]).abs())
///     }
/// }
///
/// let cached = CachedProvider::new(Ruler(vec![1.0, 3.0]));
/// assert_eq!(cached.similarity(LeafId::new(0), LeafId::new(1))?, 2.0);
/// assert_eq!(cached.similarity(LeafId::new(1), LeafId::new(0))?, 2.0);
/// assert_eq!(cached.hits(), 1);
/// assert_eq!(cached.misses(), 1);
/// # Ok::<(), ProviderError>(())
/// ```
pub struct CachedProvider<P> {
    inner: P,
    entries: DashMap<(LeafId, LeafId), f64>,
    usage: Mutex<LruCache<(LeafId, LeafId), ()>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P: SimilarityProvider> CachedProvider<P> {
    /// Wraps `inner` with the default capacity.
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    /// Wraps `inner` with an explicit configuration.
    #[must_use]
    pub fn with_config(inner: P, config: CacheConfig) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            usage: Mutex::new(LruCache::new(config.max_entries())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the number of lookups served from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of lookups delegated to the inner provider.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Consumes the decorator, yielding the inner provider.
    pub fn into_inner(self) -> P {
        self.inner
    }

    fn touch(&self, key: (LeafId, LeafId)) {
        let mut usage = self.usage.lock().expect("cache usage mutex poisoned");
        if let Some((evicted, ())) = usage.push(key, ()) {
            if evicted != key {
                self.entries.remove(&evicted);
            }
        }
    }
}

impl<P: SimilarityProvider> SimilarityProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn contains(&self, id: LeafId) -> bool {
        self.inner.contains(id)
    }

    fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError> {
        let key = canonical_key(a, b);
        if let Some(entry) = self.entries.get(&key) {
            let value = *entry;
            drop(entry);
            self.hits.fetch_add(1, Ordering::Relaxed);
            self.touch(key);
            return Ok(value);
        }
        let value = self.inner.similarity(a, b)?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key, value);
        self.touch(key);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use rstest::rstest;

    struct CountingRuler {
        values: Vec<f64>,
        calls: Arc<AtomicUsize>,
    }

    impl SimilarityProvider for CountingRuler {
        fn name(&self) -> &str {
            "counting-ruler"
        }

        fn len(&self) -> usize {
            self.values.len()
        }

        fn contains(&self, id: LeafId) -> bool {
            (id.get() as usize) < self.values.len()
        }

        fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let get = |id: LeafId| {
                self.values
                    .get(id.get() as usize)
                    .copied()
                    .ok_or(ProviderError::UnknownLeaf { id })
            };
            Ok((get(a)? - get(b)?).abs())
        }
    }

    fn ruler(calls: &Arc<AtomicUsize>) -> CountingRuler {
        CountingRuler {
            values: vec![0.0, 1.0, 3.0, 6.0],
            calls: Arc::clone(calls),
        }
    }

    #[rstest]
    fn repeated_lookups_hit_the_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedProvider::new(ruler(&calls));

        for _ in 0..3 {
            let value = cached
                .similarity(LeafId::new(0), LeafId::new(2))
                .expect("lookup must succeed");
            assert_eq!(value, 3.0);
        }

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(cached.misses(), 1);
        assert_eq!(cached.hits(), 2);
    }

    #[rstest]
    fn orientation_shares_one_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedProvider::new(ruler(&calls));

        let forward = cached
            .similarity(LeafId::new(1), LeafId::new(3))
            .expect("lookup must succeed");
        let reverse = cached
            .similarity(LeafId::new(3), LeafId::new(1))
            .expect("lookup must succeed");

        assert_eq!(forward, reverse);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[rstest]
    fn capacity_one_evicts_the_cold_pair() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CacheConfig::new(NonZeroUsize::new(1).expect("capacity is non-zero"));
        let cached = CachedProvider::with_config(ruler(&calls), config);

        cached
            .similarity(LeafId::new(0), LeafId::new(1))
            .expect("lookup must succeed");
        cached
            .similarity(LeafId::new(2), LeafId::new(3))
            .expect("lookup must succeed");
        // First pair was evicted, so this is a fresh inner call.
        cached
            .similarity(LeafId::new(0), LeafId::new(1))
            .expect("lookup must succeed");

        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(cached.hits(), 0);
    }

    #[rstest]
    fn errors_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedProvider::new(ruler(&calls));

        for _ in 0..2 {
            let err = cached
                .similarity(LeafId::new(0), LeafId::new(9))
                .expect_err("unknown leaf must fail");
            assert!(matches!(err, ProviderError::UnknownLeaf { id } if id == LeafId::new(9)));
        }

        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert_eq!(cached.misses(), 0);
    }
}
