// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use peercache_ring::{DEFAULT_REPLICAS, HashFn, HashRing, crc32c};

use crate::{PeerFetcher, PeerPicker};

type Connect = dyn Fn(&str) -> Arc<dyn PeerFetcher> + Send + Sync;

/// A [`PeerPicker`] that routes keys to peers with a consistent-hash ring.
///
/// The pool knows the name of the current process (`self_name`) and the full list of peer
/// names, which must include `self_name` and be identical on every process. Keys owned by the
/// current process are not routed anywhere; keys owned by another peer are routed to the
/// fetcher created for it by the pool's `connect` function.
///
/// The pool is transport independent: `connect` decides how a peer name turns into a
/// [`PeerFetcher`], for example an HTTP client pointed at `{peer}{base_path}`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use peercache::{BoxError, PeerFetcher, PeerPicker, PeerPool};
///
/// let pool = PeerPool::builder("http://10.0.0.1:8000", |peer: &str| {
///     let peer = peer.to_string();
///     let fetcher = move |group: &str, key: &str| -> Result<Vec<u8>, BoxError> {
///         Err(format!("no transport to {peer}/{group}/{key}").into())
///     };
///     Arc::new(fetcher) as Arc<dyn PeerFetcher>
/// })
/// .build();
///
/// // Without peers, every key stays local.
/// assert!(pool.pick_peer("user:1").is_none());
///
/// pool.set(["http://10.0.0.1:8000", "http://10.0.0.2:8000"]);
/// assert_eq!(pool.peers().len(), 2);
/// ```
pub struct PeerPool {
    self_name: String,
    connect: Box<Connect>,
    replicas: usize,
    hash: HashFn,
    state: Mutex<PoolState>,
}

struct PoolState {
    ring: HashRing,
    fetchers: HashMap<String, Arc<dyn PeerFetcher>>,
}

impl PeerPool {
    /// Creates a builder for a pool running as `self_name`.
    pub fn builder<F>(self_name: impl Into<String>, connect: F) -> PeerPoolBuilder
    where
        F: Fn(&str) -> Arc<dyn PeerFetcher> + Send + Sync + 'static,
    {
        PeerPoolBuilder {
            self_name: self_name.into(),
            connect: Box::new(connect),
            replicas: DEFAULT_REPLICAS,
            hash: crc32c,
        }
    }

    /// Replaces the set of peers.
    ///
    /// The ring and the fetchers are rebuilt from scratch and swapped in at once. `connect`
    /// runs without the pool's lock held, so it may call back into the pool, and lookups keep
    /// using the previous set until the swap.
    pub fn set<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers: Vec<S> = peers.into_iter().collect();

        let mut ring = HashRing::new(self.replicas, self.hash);
        ring.add(&peers);
        let fetchers = peers
            .iter()
            .map(|peer| (peer.as_ref().to_string(), (self.connect)(peer.as_ref())))
            .collect();
        let count = ring.len();

        *self.state.lock() = PoolState { ring, fetchers };

        tracing::info!(peer.local = %self.self_name, peer.count = count, "pool.peers_set");
    }

    /// Returns the names of all peers, in the order they were set.
    #[must_use]
    pub fn peers(&self) -> Vec<String> {
        self.state.lock().ring.peers().map(str::to_string).collect()
    }

    /// Returns the name of the peer owning `key`, including the current process.
    #[must_use]
    pub fn owner(&self, key: &str) -> Option<String> {
        self.state.lock().ring.get(key).map(str::to_string)
    }
}

impl PeerPicker for PeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let state = self.state.lock();
        let owner = state.ring.get(key)?;
        if owner == self.self_name {
            return None;
        }

        tracing::debug!(peer.local = %self.self_name, peer.picked = owner, cache.key = key, "pool.peer_picked");
        state.fetchers.get(owner).map(Arc::clone)
    }
}

impl Debug for PeerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerPool")
            .field("self_name", &self.self_name)
            .field("ring", &self.state.lock().ring)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PeerPool`].
pub struct PeerPoolBuilder {
    self_name: String,
    connect: Box<Connect>,
    replicas: usize,
    hash: HashFn,
}

impl PeerPoolBuilder {
    /// Sets the number of virtual nodes per peer. Defaults to [`DEFAULT_REPLICAS`].
    ///
    /// Every process must use the same value.
    #[must_use]
    pub fn replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Sets the ring hash. Defaults to CRC-32C.
    ///
    /// Every process must use the same function.
    #[must_use]
    pub fn hash(mut self, hash: HashFn) -> Self {
        self.hash = hash;
        self
    }

    /// Builds a pool with no peers.
    ///
    /// # Panics
    ///
    /// Panics if the replica count is 0.
    #[must_use]
    pub fn build(self) -> PeerPool {
        PeerPool {
            self_name: self.self_name,
            connect: self.connect,
            replicas: self.replicas,
            hash: self.hash,
            state: Mutex::new(PoolState {
                ring: HashRing::new(self.replicas, self.hash),
                fetchers: HashMap::new(),
            }),
        }
    }
}

impl Debug for PeerPoolBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerPoolBuilder")
            .field("self_name", &self.self_name)
            .field("replicas", &self.replicas)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use static_assertions::assert_impl_all;
    use testing_aids::execute_or_abandon;

    use super::*;
    use crate::BoxError;

    fn echo_pool(self_name: &str) -> PeerPool {
        PeerPool::builder(self_name, |peer: &str| {
            let peer = peer.to_string();
            let fetcher = move |_: &str, _: &str| -> Result<Vec<u8>, BoxError> { Ok(peer.clone().into_bytes()) };
            Arc::new(fetcher) as Arc<dyn PeerFetcher>
        })
        .build()
    }

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(PeerPool: Send, Sync);
    }

    #[test]
    fn empty_pool_picks_nothing() {
        let pool = echo_pool("a");
        assert!(pool.pick_peer("key").is_none());
        assert!(pool.owner("key").is_none());
    }

    #[test]
    fn never_picks_self() {
        let pool = echo_pool("a");
        pool.set(["a", "b", "c"]);

        for i in 0..500 {
            let key = format!("key-{i}");
            let owner = pool.owner(&key).unwrap();
            match pool.pick_peer(&key) {
                None => assert_eq!(owner, "a"),
                Some(fetcher) => {
                    assert_ne!(owner, "a");
                    assert_eq!(fetcher.fetch("g", &key).unwrap(), owner.as_bytes());
                }
            }
        }
    }

    #[test]
    fn set_replaces_previous_peers() {
        let pool = echo_pool("a");
        pool.set(["a", "b"]);
        pool.set(["a", "c"]);

        assert_eq!(pool.peers(), ["a", "c"]);
        for i in 0..200 {
            assert_ne!(pool.owner(&format!("key-{i}")).unwrap(), "b");
        }
    }

    #[test]
    fn only_self_keeps_everything_local() {
        let pool = echo_pool("a");
        pool.set(["a"]);

        assert!((0..100).all(|i| pool.pick_peer(&format!("key-{i}")).is_none()));
    }

    #[test]
    fn connect_may_read_pool() {
        let seen = execute_or_abandon(|| {
            let handle: Arc<OnceLock<Arc<PeerPool>>> = Arc::new(OnceLock::new());
            let seen = Arc::new(Mutex::new(Vec::new()));

            let pool = {
                let handle = Arc::clone(&handle);
                let seen = Arc::clone(&seen);
                PeerPool::builder("a", move |peer: &str| {
                    if let Some(pool) = handle.get() {
                        seen.lock().push((peer.to_string(), pool.peers(), pool.owner("key").is_some()));
                    }
                    let fetcher = |_: &str, _: &str| -> Result<Vec<u8>, BoxError> { Ok(Vec::new()) };
                    Arc::new(fetcher) as Arc<dyn PeerFetcher>
                })
                .build()
            };
            let pool = Arc::new(pool);
            assert!(handle.set(Arc::clone(&pool)).is_ok());

            pool.set(["a", "b"]);
            pool.set(["a", "c"]);
            assert_eq!(pool.peers(), ["a", "c"]);

            let seen = seen.lock().clone();
            seen
        })
        .expect("set must not block while connecting peers");

        // The second set connects while the first set is still in effect.
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], ("a".to_string(), Vec::<String>::new(), false));
        assert_eq!(seen[2], ("a".to_string(), vec!["a".to_string(), "b".to_string()], true));
    }

    #[test]
    fn builder_options_reach_ring() {
        fn zero(_: &[u8]) -> u32 {
            0
        }

        let pool = PeerPool::builder("a", |_: &str| {
            let fetcher = |_: &str, _: &str| -> Result<Vec<u8>, BoxError> { Ok(Vec::new()) };
            Arc::new(fetcher) as Arc<dyn PeerFetcher>
        })
        .replicas(3)
        .hash(zero)
        .build();
        pool.set(["b", "a"]);

        // All virtual nodes collide; the smaller peer name wins.
        assert_eq!(pool.owner("anything").as_deref(), Some("a"));
        assert!(format!("{pool:?}").contains("replicas: 3"));
    }
}
