// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use parking_lot::Mutex;
use peercache_lru::LruStore;

use crate::ByteView;
use crate::stats::{CacheStats, Counter};

/// A thread-safe, byte-bounded LRU cache of [`ByteView`]s.
///
/// Every [`Group`](crate::Group) owns one. A `cache_bytes` budget of 0 leaves the cache
/// unbounded.
///
/// # Examples
///
/// ```
/// use peercache::{ByteView, LocalCache};
///
/// let cache = LocalCache::new(1024);
/// cache.add("Tom", ByteView::from("630"));
///
/// assert_eq!(cache.get("Tom").map(|v| v.as_string()), Some("630".to_string()));
/// assert_eq!(cache.stats().hits, 1);
/// ```
///
/// # Thread safety
///
/// This type is thread-safe. Every operation takes a short exclusive lock.
pub struct LocalCache {
    store: Mutex<LruStore<ByteView>>,
    gets: Counter,
    hits: Counter,
    evictions: Arc<Counter>,
}

impl LocalCache {
    /// Creates a cache holding at most `cache_bytes` bytes of keys and values.
    #[must_use]
    pub fn new(cache_bytes: usize) -> Self {
        let evictions = Arc::new(Counter::default());
        let observer = {
            let evictions = Arc::clone(&evictions);
            move |_key: &str, _value: &ByteView| evictions.increment()
        };

        Self {
            store: Mutex::new(LruStore::with_observer(cache_bytes, observer)),
            gets: Counter::default(),
            hits: Counter::default(),
            evictions,
        }
    }

    /// Returns the cached value of `key` and marks it most recently used.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.gets.increment();
        let value = self.store.lock().get(key).cloned();
        if value.is_some() {
            self.hits.increment();
        }
        value
    }

    /// Inserts or replaces the value of `key`, evicting least recently used entries as needed.
    pub fn add(&self, key: &str, value: ByteView) {
        self.store.lock().add(key, value);
    }

    /// Returns point-in-time counters for this cache.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        CacheStats {
            bytes: store.bytes(),
            items: store.len(),
            gets: self.gets.get(),
            hits: self.hits.get(),
            evictions: self.evictions.get(),
        }
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").field("stats", &self.stats()).finish()
    }
}
