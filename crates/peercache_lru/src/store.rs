// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::ByteLen;
use crate::list::{NodeIndex, RecencyList};

/// Receives entries evicted from an [`LruStore`].
///
/// The observer runs synchronously inside the mutating call, after the entry has been
/// unlinked and before it is handed back or dropped. It is implemented for every
/// `FnMut(&str, &V) + Send` closure.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use peercache_lru::LruStore;
///
/// let evicted = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&evicted);
/// let mut store = LruStore::with_observer(2, move |key: &str, _value: &String| {
///     sink.lock().unwrap().push(key.to_string());
/// });
///
/// store.add("a", String::new());
/// store.add("b", String::new());
/// store.add("c", String::new());
///
/// assert_eq!(*evicted.lock().unwrap(), ["a"]);
/// ```
pub trait EvictionObserver<V>: Send {
    /// Called with the key and value of an entry leaving the store.
    fn on_evicted(&mut self, key: &str, value: &V);
}

impl<V, F> EvictionObserver<V> for F
where
    F: FnMut(&str, &V) + Send,
{
    fn on_evicted(&mut self, key: &str, value: &V) {
        self(key, value);
    }
}

/// A least-recently-used store bounded by a byte budget.
///
/// Each entry is charged `key.len() + value.byte_len()` bytes. After every [`add`](Self::add)
/// the store evicts least-recently-used entries until the total fits the budget again,
/// so the budget is only ever exceeded transiently inside a single call. A budget of `0`
/// means unbounded.
///
/// An entry that is larger than the whole budget is inserted and then evicted by the same call.
///
/// See the [crate documentation](crate) for an example.
pub struct LruStore<V> {
    max_bytes: usize,
    bytes: usize,
    list: RecencyList<V>,
    index: HashMap<String, NodeIndex>,
    observer: Option<Box<dyn EvictionObserver<V>>>,
}

impl<V: ByteLen> LruStore<V> {
    /// Creates an empty store with the given byte budget, `0` meaning unbounded.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            bytes: 0,
            list: RecencyList::new(),
            index: HashMap::new(),
            observer: None,
        }
    }

    /// Creates an empty store that reports evictions to `observer`.
    #[must_use]
    pub fn with_observer(max_bytes: usize, observer: impl EvictionObserver<V> + 'static) -> Self {
        Self {
            observer: Some(Box::new(observer)),
            ..Self::new(max_bytes)
        }
    }

    /// Looks up a key, promoting it to most recently used on a hit.
    ///
    /// A miss leaves the store untouched.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.list.move_to_back(idx);
        Some(self.list.value(idx))
    }

    /// Inserts or replaces a value and promotes it to most recently used.
    ///
    /// Replacing an existing key adjusts the accounted bytes by the difference between the
    /// old and new value sizes. Afterwards, least-recently-used entries are evicted while the
    /// budget is exceeded.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Some(&idx) = self.index.get(&key) {
            let new_len = value.byte_len();
            let old = std::mem::replace(self.list.value_mut(idx), value);
            self.bytes = self.bytes - old.byte_len() + new_len;
            self.list.move_to_back(idx);
        } else {
            self.bytes += key.len() + value.byte_len();
            let idx = self.list.push_back(key.clone(), value);
            self.index.insert(key, idx);
        }

        while self.max_bytes != 0 && self.bytes > self.max_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    /// Evicts the least recently used entry, notifying the observer.
    ///
    /// Returns the evicted entry, or `None` if the store is empty.
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let idx = self.list.front()?;
        let (key, value) = self.detach(idx);

        if let Some(observer) = self.observer.as_mut() {
            observer.on_evicted(&key, &value);
        }

        Some((key, value))
    }

    /// Removes a key without notifying the observer.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = *self.index.get(key)?;
        Some(self.detach(idx).1)
    }

    /// Evicts every entry, oldest first, notifying the observer for each.
    pub fn clear(&mut self) {
        while self.remove_oldest().is_some() {}
    }

    fn detach(&mut self, idx: NodeIndex) -> (String, V) {
        let (key, value) = self.list.remove(idx);
        self.index.remove(&key);
        self.bytes -= key.len() + value.byte_len();
        (key, value)
    }
}

impl<V> LruStore<V> {
    /// Returns `true` if the key is present, without promoting it.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the value for a key without promoting it.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&idx| self.list.value(idx))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.len() == 0
    }

    /// Returns the bytes currently charged against the budget.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the keys in eviction order, least recently used first.
    #[must_use]
    pub fn keys_lru(&self) -> Vec<&str> {
        self.list.iter().map(|(key, _)| key).collect()
    }

    /// Returns the key that the next eviction would remove.
    #[must_use]
    pub fn oldest_key(&self) -> Option<&str> {
        self.list.front().map(|idx| self.list.key(idx))
    }
}

impl<V> Debug for LruStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruStore")
            .field("max_bytes", &self.max_bytes)
            .field("bytes", &self.bytes)
            .field("len", &self.list.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Log = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

    fn observed(max_bytes: usize) -> (LruStore<Vec<u8>>, Log) {
        let log = Log::default();
        let sink = Arc::clone(&log);
        let store = LruStore::with_observer(max_bytes, move |key: &str, value: &Vec<u8>| {
            sink.lock().unwrap().push((key.to_string(), value.clone()));
        });
        (store, log)
    }

    #[test]
    fn get_hits_and_misses() {
        let mut store = LruStore::new(0);
        store.add("key1", b"1234".to_vec());

        assert_eq!(store.get("key1").map(Vec::as_slice), Some(&b"1234"[..]));
        assert!(store.get("key2").is_none());
    }

    #[test]
    fn accounts_key_and_value_bytes() {
        let mut store = LruStore::new(0);
        store.add("key", vec![0; 10]);
        assert_eq!(store.bytes(), 13);

        store.add("k", vec![0; 2]);
        assert_eq!(store.bytes(), 16);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn replacing_value_adjusts_by_size_delta() {
        let mut store = LruStore::new(0);
        store.add("key", vec![0; 10]);
        store.add("key", vec![0; 4]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes(), 7);
        assert_eq!(store.peek("key").map(Vec::len), Some(4));

        store.add("key", vec![0; 20]);
        assert_eq!(store.bytes(), 23);
    }

    #[test]
    fn replacing_value_promotes_entry() {
        let mut store = LruStore::new(0);
        store.add("a", vec![1]);
        store.add("b", vec![2]);
        store.add("a", vec![3]);

        assert_eq!(store.keys_lru(), ["b", "a"]);
    }

    #[test]
    fn miss_does_not_reorder() {
        let mut store = LruStore::new(0);
        store.add("a", vec![1]);
        store.add("b", vec![2]);

        assert!(store.get("zzz").is_none());
        assert_eq!(store.keys_lru(), ["a", "b"]);
    }

    #[test]
    fn remove_oldest_evicts_lru_and_notifies() {
        let (mut store, log) = observed(0);
        store.add("k1", b"v1".to_vec());
        store.add("k2", b"v2".to_vec());

        let evicted = store.remove_oldest();
        assert_eq!(evicted, Some(("k1".to_string(), b"v1".to_vec())));
        assert_eq!(store.bytes(), 4);
        assert_eq!(*log.lock().unwrap(), [("k1".to_string(), b"v1".to_vec())]);
    }

    #[test]
    fn remove_oldest_on_empty_store_is_noop() {
        let (mut store, log) = observed(0);
        assert!(store.remove_oldest().is_none());
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(store.bytes(), 0);
    }

    #[test]
    fn overflow_evicts_until_budget_fits() {
        let (mut store, log) = observed(10);
        store.add("k1", b"v1".to_vec());
        store.add("k2", b"v2".to_vec());
        store.add("k3", b"v3".to_vec());
        store.add("k4", b"v4-long".to_vec());

        assert!(store.bytes() <= 10);
        let evicted: Vec<String> = log.lock().unwrap().iter().map(|(key, _)| key.clone()).collect();
        assert_eq!(evicted, ["k1", "k2", "k3"]);
        assert_eq!(store.keys_lru(), ["k4"]);
    }

    #[test]
    fn oversized_entry_is_inserted_then_evicted() {
        let (mut store, log) = observed(8);
        store.add("small", vec![0]);
        store.add("huge", vec![0; 64]);

        assert!(store.is_empty());
        assert_eq!(store.bytes(), 0);
        let evicted: Vec<String> = log.lock().unwrap().iter().map(|(key, _)| key.clone()).collect();
        assert_eq!(evicted, ["small", "huge"]);
    }

    #[test]
    fn zero_budget_never_evicts() {
        let (mut store, log) = observed(0);
        for i in 0..1_000 {
            store.add(format!("key{i}"), vec![0; 100]);
        }

        assert_eq!(store.len(), 1_000);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn remove_skips_observer() {
        let (mut store, log) = observed(0);
        store.add("a", vec![1, 2]);

        assert_eq!(store.remove("a"), Some(vec![1, 2]));
        assert!(store.remove("a").is_none());
        assert_eq!(store.bytes(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn clear_notifies_oldest_first() {
        let (mut store, log) = observed(0);
        store.add("a", vec![1]);
        store.add("b", vec![2]);
        let _ = store.get("a");
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.bytes(), 0);
        let evicted: Vec<String> = log.lock().unwrap().iter().map(|(key, _)| key.clone()).collect();
        assert_eq!(evicted, ["b", "a"]);
    }

    #[test]
    fn peek_and_contains_do_not_promote() {
        let mut store = LruStore::new(0);
        store.add("a", vec![1]);
        store.add("b", vec![2]);

        assert!(store.contains("a"));
        assert!(store.peek("a").is_some());
        assert_eq!(store.oldest_key(), Some("a"));
    }

    #[test]
    fn debug_reports_accounting() {
        let mut store = LruStore::new(100);
        store.add("a", vec![1]);
        let debug = format!("{store:?}");
        assert!(debug.contains("LruStore"));
        assert!(debug.contains("bytes: 2"));
    }
}
