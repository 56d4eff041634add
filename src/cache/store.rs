//! Cache Store Module
//!
//! Read-through cache combining the LRU store with TTL expiry and fallback
//! loading of misses.
//!
//! # Locking
//! The store sits behind two locks:
//! - an outer `tokio::sync::RwLock`, held shared by `get*`/`has` for the whole
//!   call including the fallback, and exclusively by `set`/`del`/`clear`;
//! - an inner `parking_lot::Mutex`, taken briefly by readers for promotion,
//!   lazy expiry removal and population. It is never held across an `.await`.
//!
//! Readers therefore never block each other, writers wait for every in-flight
//! read and fallback, and concurrent misses on the same key each run their own
//! fallback call.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::fallback::{fallback_multi, resolve_one, EmptyCheck, FallbackMulti};
use crate::cache::{CacheEntry, CacheResult, LruStore};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

type Shared<K, V> = Mutex<LruStore<K, CacheEntry<V>>>;

// == LRU Cache ==
/// Thread-safe read-through cache with LRU eviction and TTL expiry.
pub struct LruCache<K, V> {
    store: RwLock<Shared<K, V>>,
    /// TTL applied to every stored entry
    ttl: Duration,
    /// Whether empty fallback results are stored
    cache_empty: bool,
    /// Extra emptiness rule on top of "resolved nothing"
    empty_when: Option<EmptyCheck<V>>,
    /// Default batched fallback
    fallback: Option<FallbackMulti<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Starts building a cache holding at most `capacity` entries for `ttl`.
    pub fn builder(capacity: usize, ttl: Duration) -> CacheBuilder<K, V> {
        CacheBuilder::new(capacity, ttl)
    }

    /// Builds a cache from a loaded [`CacheConfig`].
    pub fn from_config(config: &CacheConfig, fallback: Option<FallbackMulti<K, V>>) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder(config.capacity, config.ttl_duration())
            .cache_empty(config.cache_empty);
        builder.fallback = fallback;
        builder.build()
    }

    // == Get ==
    /// Looks up `key`, resolving a miss through the default fallback.
    ///
    /// Without a default fallback a miss yields `Ok(None)` and stores nothing.
    pub async fn get(&self, key: K) -> CacheResult<Option<V>> {
        match self.fallback.clone() {
            Some(fallback) => {
                self.get_with_fallback(key, move |k| resolve_one(fallback, k))
                    .await
            }
            None => {
                let store = self.store.read().await;
                CacheResult::ok(self.lookup(&store, &key).flatten())
            }
        }
    }

    /// Looks up `key`, resolving a miss through `fallback`.
    ///
    /// A fallback error is returned as [`CacheError::Fallback`] and nothing is
    /// stored. An empty result is returned but only stored when empty values
    /// are cached.
    pub async fn get_with_fallback<F, Fut>(&self, key: K, fallback: F) -> CacheResult<Option<V>>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = anyhow::Result<Option<V>>>,
    {
        let store = self.store.read().await;

        if let Some(hit) = self.lookup(&store, &key) {
            return CacheResult::ok(hit);
        }

        debug!("Cache miss, invoking fallback");
        let resolved = match fallback(key.clone()).await {
            Ok(value) => value,
            Err(err) => return CacheResult::err(CacheError::Fallback(err)),
        };

        if self.should_store(resolved.as_ref()) {
            self.populate(&store, key, resolved.clone());
        }
        CacheResult::ok(resolved)
    }

    // == Get Multi ==
    /// Looks up `keys`, resolving all misses through one call to the default
    /// fallback.
    pub async fn get_multi(&self, keys: &[K]) -> CacheResult<HashMap<K, V>> {
        match self.fallback.clone() {
            Some(fallback) => {
                self.get_multi_with_fallback(keys, move |missed| fallback(missed))
                    .await
            }
            None => {
                let store = self.store.read().await;
                let (vals, _) = self.partition(&store, keys);
                CacheResult::ok(vals)
            }
        }
    }

    /// Looks up `keys`, resolving all misses through one call to `fallback`.
    ///
    /// The fallback receives exactly the missing keys, once each, and is not
    /// called when everything hits. Its error is logged and swallowed: the
    /// result then holds the cache hits only. Keys the fallback leaves out
    /// are omitted from the result.
    pub async fn get_multi_with_fallback<F, Fut>(
        &self,
        keys: &[K],
        fallback: F,
    ) -> CacheResult<HashMap<K, V>>
    where
        F: FnOnce(Vec<K>) -> Fut,
        Fut: Future<Output = anyhow::Result<HashMap<K, V>>>,
    {
        let store = self.store.read().await;

        let (mut vals, missed) = self.partition(&store, keys);
        if missed.is_empty() {
            return CacheResult::ok(vals);
        }

        debug!(
            hits = vals.len(),
            misses = missed.len(),
            "Cache multi miss, invoking batched fallback"
        );
        let mut resolved = match fallback(missed.clone()).await {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(
                    error = %err,
                    misses = missed.len(),
                    "Batched fallback failed, returning cached hits only"
                );
                return CacheResult::ok(vals);
            }
        };

        for key in missed {
            let value = resolved.remove(&key);
            if self.should_store(value.as_ref()) {
                self.populate(&store, key.clone(), value.clone());
            }
            if let Some(value) = value {
                vals.insert(key, value);
            }
        }

        CacheResult::ok(vals)
    }

    // == Set ==
    /// Stores `val` under `key`, refreshing its expiry.
    pub async fn set(&self, key: K, val: V) -> CacheResult<bool> {
        let mut store = self.store.write().await;
        if store.get_mut().add(key, CacheEntry::new(Some(val), self.ttl)) {
            debug!("Evicted least recently used entry");
        }
        CacheResult::ok(true)
    }

    /// Stores every pair. Not atomic: readers may observe a partial batch.
    pub async fn set_multi<I>(&self, values: I) -> CacheResult<bool>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, val) in values {
            if let Err(err) = self.set(key, val).await.into_result() {
                return CacheResult::err(err);
            }
        }
        CacheResult::ok(true)
    }

    // == Delete ==
    /// Removes `keys`, returning how many were present.
    pub async fn del(&self, keys: &[K]) -> CacheResult<usize> {
        let mut store = self.store.write().await;
        let store = store.get_mut();
        let removed = keys.iter().filter(|key| store.remove(key)).count();
        CacheResult::ok(removed)
    }

    // == Has ==
    /// Whether `key` holds a live entry. An expired entry is removed.
    pub async fn has(&self, key: &K) -> CacheResult<bool> {
        let store = self.store.read().await;
        CacheResult::ok(self.lookup(&store, key).is_some())
    }

    // == Clear ==
    /// Drops every entry.
    pub async fn clear(&self) -> CacheResult<bool> {
        let mut store = self.store.write().await;
        store.get_mut().clear();
        CacheResult::ok(true)
    }

    // == Accessors ==
    /// Number of resident entries, expired-but-unread ones included.
    pub async fn len(&self) -> usize {
        self.store.read().await.lock().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn capacity(&self) -> usize {
        self.store.read().await.lock().capacity()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Internals ==
    /// Returns `Some(value)` for a live entry (`value` is `None` for a
    /// negative entry) and `None` on a miss, dropping an expired entry.
    fn lookup(&self, store: &Shared<K, V>, key: &K) -> Option<Option<V>> {
        let mut store = store.lock();
        match store.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        debug!("Dropping expired entry");
        store.remove(key);
        None
    }

    /// Splits `keys` into live values and distinct missing keys, in request order.
    fn partition(&self, store: &Shared<K, V>, keys: &[K]) -> (HashMap<K, V>, Vec<K>) {
        let mut vals = HashMap::with_capacity(keys.len());
        let mut missed = Vec::new();
        let mut seen = HashSet::with_capacity(keys.len());

        for key in keys {
            if !seen.insert(key) {
                continue;
            }
            match self.lookup(store, key) {
                Some(Some(value)) => {
                    vals.insert(key.clone(), value);
                }
                Some(None) => {}
                None => missed.push(key.clone()),
            }
        }

        (vals, missed)
    }

    fn should_store(&self, value: Option<&V>) -> bool {
        self.cache_empty || !self.is_empty_value(value)
    }

    fn is_empty_value(&self, value: Option<&V>) -> bool {
        match value {
            None => true,
            Some(value) => self.empty_when.as_ref().is_some_and(|is_empty| is_empty(value)),
        }
    }

    fn populate(&self, store: &Shared<K, V>, key: K, value: Option<V>) {
        if store.lock().add(key, CacheEntry::new(value, self.ttl)) {
            debug!("Evicted least recently used entry");
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("ttl", &self.ttl)
            .field("cache_empty", &self.cache_empty)
            .field("has_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

// == Cache Builder ==
/// Configures and validates an [`LruCache`].
pub struct CacheBuilder<K, V> {
    capacity: usize,
    ttl: Duration,
    cache_empty: bool,
    empty_when: Option<EmptyCheck<V>>,
    fallback: Option<FallbackMulti<K, V>>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            cache_empty: false,
            empty_when: None,
            fallback: None,
        }
    }

    /// Sets the default batched fallback used by `get` and `get_multi`.
    pub fn fallback<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HashMap<K, V>>> + Send + 'static,
    {
        self.fallback = Some(fallback_multi(f));
        self
    }

    /// Whether empty fallback results are stored (default: false).
    pub fn cache_empty(mut self, cache_empty: bool) -> Self {
        self.cache_empty = cache_empty;
        self
    }

    /// Treats resolved values matching `predicate` as empty.
    ///
    /// A key the fallback did not resolve is always empty.
    pub fn empty_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.empty_when = Some(std::sync::Arc::new(predicate));
        self
    }

    /// Validates the parameters and builds the cache.
    ///
    /// Expiry has seconds resolution, so the TTL must be a positive whole
    /// number of seconds. Fractional TTLs are rejected rather than truncated.
    pub fn build(self) -> Result<LruCache<K, V>> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be positive".to_string(),
            ));
        }
        if self.ttl.as_secs() == 0 || self.ttl.subsec_nanos() != 0 {
            return Err(CacheError::InvalidConfig(format!(
                "ttl must be a positive whole number of seconds, got {:?}",
                self.ttl
            )));
        }

        Ok(LruCache {
            store: RwLock::new(Mutex::new(LruStore::new(self.capacity))),
            ttl: self.ttl,
            cache_empty: self.cache_empty,
            empty_when: self.empty_when,
            fallback: self.fallback,
        })
    }
}
