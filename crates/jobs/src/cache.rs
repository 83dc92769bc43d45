//! Capacity-bounded key/value store with per-entry expiry.
//!
//! [`TtlCache`] wraps an [`LruCache`] behind a mutex. Every write stamps the
//! entry with a fresh deadline; reads never extend it. When the cache is full
//! a new key first displaces already-expired entries and then the
//! least-recently-used one, whatever its remaining TTL.
//!
//! Failures never propagate: a poisoned lock is logged, reported as `false`
//! or absent, and cleared so the next call can proceed.

use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

/// Default entry lifetime: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Internal store failure. Never escapes the public API.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache lock poisoned by a panicking writer")]
    Poisoned,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A live entry as seen by [`TtlCache::entries`].
#[derive(Debug, Clone)]
pub struct LiveEntry<K, V> {
    pub key: K,
    pub value: V,
    pub ttl_remaining: Duration,
}

/// Thread-safe TTL + LRU cache. Values are cloned out on read.
pub struct TtlCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        tracing::info!(
            capacity = capacity.get(),
            ttl_secs = default_ttl.as_secs(),
            "Cache initialized",
        );
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            default_ttl,
        }
    }

    /// Store `value` under `key`, replacing any previous entry wholesale.
    ///
    /// The entry expires `ttl` from now, or after the default TTL when `ttl`
    /// is `None`. Returns `false` if the store failed.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) -> bool {
        match self.try_set(key, value, ttl) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Cache set failed");
                false
            }
        }
    }

    /// Fetch a clone of the live value under `key`.
    ///
    /// Counts as a use for LRU ordering but does not extend the TTL. An
    /// expired entry is dropped and reported absent.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "Cache get failed");
                None
            }
        }
    }

    /// Remove `key` if present. Returns `false` only if the store failed.
    pub fn delete(&self, key: &K) -> bool {
        match self.lock() {
            Ok(mut cache) => {
                cache.pop(key);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Remove every entry. Returns `false` only if the store failed.
    pub fn clear(&self) -> bool {
        match self.lock() {
            Ok(mut cache) => {
                cache.clear();
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Cache clear failed");
                false
            }
        }
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        match self.lock() {
            Ok(mut cache) => purge(&mut cache, Instant::now()),
            Err(e) => {
                tracing::error!(error = %e, "Cache purge failed");
                0
            }
        }
    }

    /// Snapshot of unexpired entries, most recently used first.
    ///
    /// Does not affect LRU ordering.
    pub fn entries(&self) -> Vec<LiveEntry<K, V>> {
        let cache = match self.lock() {
            Ok(cache) => cache,
            Err(e) => {
                tracing::error!(error = %e, "Cache snapshot failed");
                return Vec::new();
            }
        };
        let now = Instant::now();
        cache
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| LiveEntry {
                key: key.clone(),
                value: entry.value.clone(),
                ttl_remaining: entry.expires_at.saturating_duration_since(now),
            })
            .collect()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.lock().map(|cache| cache.cap().get()).unwrap_or(0)
    }

    /// TTL applied when `set` is called without one.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // ---- private helpers ----

    fn try_set(&self, key: K, value: V, ttl: Option<Duration>) -> Result<(), StoreError> {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now + ttl.unwrap_or(self.default_ttl),
        };

        let mut cache = self.lock()?;
        let replacing = cache.contains(&key);
        if !replacing && cache.len() >= cache.cap().get() {
            purge(&mut cache, now);
        }
        if let Some((evicted, _)) = cache.push(key, entry) {
            if !replacing {
                tracing::debug!(key = ?evicted, "Evicted least-recently-used cache entry");
            }
        }
        Ok(())
    }

    fn try_get(&self, key: &K) -> Result<Option<V>, StoreError> {
        let now = Instant::now();
        let mut cache = self.lock()?;
        match cache.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }
        cache.pop(key);
        Ok(None)
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<K, CacheEntry<V>>>, StoreError> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard),
            Err(poisoned) => {
                drop(poisoned);
                self.inner.clear_poison();
                Err(StoreError::Poisoned)
            }
        }
    }
}

fn purge<K: Hash + Eq + Clone, V>(cache: &mut LruCache<K, CacheEntry<V>>, now: Instant) -> usize {
    let expired: Vec<K> = cache
        .iter()
        .filter(|(_, entry)| !entry.is_live(now))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &expired {
        cache.pop(key);
    }
    expired.len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
