// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use peercache_flight::Flight;

use crate::cache::LocalCache;
use crate::stats::{CacheStats, GroupStats, GroupStatsSnapshot};
use crate::telemetry::{GroupActivity, emit};
use crate::{ByteView, Error, GroupRegistry, Loader, PeerFetcher, PeerPicker, Result};

/// A named cache namespace with its own loader, local cache and peers.
///
/// A lookup through [`get`](Self::get) is answered, in order, by:
///
/// 1. the group's local cache;
/// 2. the remote peer that owns the key, if peers are registered and the key is not owned by
///    the current process;
/// 3. the group's [`Loader`], whose result is stored in the local cache.
///
/// Concurrent misses for the same key are collapsed: one caller does the work and the others
/// receive a clone of its value or error. Values fetched from a remote peer are returned
/// without being cached locally, so each key is cached only by its owner.
///
/// Groups are created through [`GroupRegistry::new_group`] or [`GroupBuilder`] and shared as
/// `Arc<Group>`.
///
/// # Thread safety
///
/// This type is thread-safe.
pub struct Group {
    name: String,
    cache: LocalCache,
    loader: Arc<dyn Loader>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: Flight<String, Result<ByteView>>,
    stats: GroupStats,
}

impl Group {
    /// Creates a builder for a group called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(name)
    }

    pub(crate) fn new(name: String, cache_bytes: usize, loader: Arc<dyn Loader>) -> Self {
        Self {
            name,
            cache: LocalCache::new(cache_bytes),
            loader,
            peers: OnceLock::new(),
            flight: Flight::new(),
            stats: GroupStats::default(),
        }
    }

    /// Returns the group's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs the peer picker used to route keys to their owners.
    ///
    /// Until peers are registered, every miss is loaded locally.
    ///
    /// # Panics
    ///
    /// Panics if peers were already registered for this group.
    #[expect(clippy::panic, reason = "registering peers twice is a wiring bug in the host")]
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) {
        if self.peers.set(peers).is_err() {
            panic!("peers already registered for group {:?}", self.name);
        }
    }

    /// Returns the value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyKey`] if `key` is empty, or [`Error::Load`] if the value was not
    /// cached and the loader failed. Failed loads are not cached; the next lookup tries again.
    pub fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        self.stats.gets.increment();
        if let Some(value) = self.cache.get(key) {
            self.stats.cache_hits.increment();
            emit(&self.name, key, GroupActivity::Hit, None);
            return Ok(value);
        }

        self.load(key)
    }

    /// Returns point-in-time counters for this group.
    #[must_use]
    pub fn stats(&self) -> GroupStatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns point-in-time counters for this group's local cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn load(&self, key: &str) -> Result<ByteView> {
        self.stats.loads.increment();

        self.flight.work(key.to_string(), || {
            // Another caller may have populated the cache between our miss and winning the flight.
            if let Some(value) = self.cache.get(key) {
                self.stats.cache_hits.increment();
                return Ok(value);
            }

            self.stats.loads_deduped.increment();

            if let Some(peer) = self.peers.get().and_then(|peers| peers.pick_peer(key)) {
                match self.get_from_peer(peer.as_ref(), key) {
                    Ok(value) => {
                        self.stats.peer_loads.increment();
                        emit(&self.name, key, GroupActivity::PeerLoad, None);
                        return Ok(value);
                    }
                    Err(error) => {
                        self.stats.peer_errors.increment();
                        emit(&self.name, key, GroupActivity::PeerError, Some(&error));
                    }
                }
            }

            self.get_locally(key)
        })
    }

    fn get_from_peer(&self, peer: &dyn PeerFetcher, key: &str) -> std::result::Result<ByteView, crate::BoxError> {
        peer.fetch(&self.name, key).map(ByteView::from)
    }

    fn get_locally(&self, key: &str) -> Result<ByteView> {
        match self.loader.load(key) {
            Ok(bytes) => {
                self.stats.local_loads.increment();
                emit(&self.name, key, GroupActivity::LocalLoad, None);

                let value = ByteView::from(bytes);
                self.cache.add(key, value.clone());
                Ok(value)
            }
            Err(error) => {
                self.stats.local_load_errs.increment();
                emit(&self.name, key, GroupActivity::LocalLoadError, Some(&error));
                Err(Error::load(key, error))
            }
        }
    }
}

impl Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .field("peers_registered", &self.peers.get().is_some())
            .field("flight", &self.flight)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Group`].
///
/// # Examples
///
/// ```
/// use peercache::{Group, GroupRegistry, loader_fn};
///
/// let registry = GroupRegistry::new();
/// let group = Group::builder("thumbnails")
///     .cache_bytes(64 << 20)
///     .register(&registry, loader_fn(|key| Ok(format!("thumb of {key}").into_bytes())));
///
/// assert_eq!(group.get("cat.png").unwrap().as_string(), "thumb of cat.png");
/// assert!(registry.get_group("thumbnails").is_some());
/// ```
pub struct GroupBuilder {
    name: String,
    cache_bytes: usize,
    peers: Option<Arc<dyn PeerPicker>>,
}

impl GroupBuilder {
    /// Creates a builder for a group called `name` with an unbounded cache and no peers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache_bytes: 0,
            peers: None,
        }
    }

    /// Sets the byte budget of the group's local cache. 0 means unbounded.
    #[must_use]
    pub fn cache_bytes(mut self, cache_bytes: usize) -> Self {
        self.cache_bytes = cache_bytes;
        self
    }

    /// Registers `peers` with the group as it is built.
    #[must_use]
    pub fn peers(mut self, peers: Arc<dyn PeerPicker>) -> Self {
        self.peers = Some(peers);
        self
    }

    /// Builds a standalone group that is not registered anywhere.
    #[must_use]
    pub fn build(self, loader: impl Loader + 'static) -> Group {
        let group = Group::new(self.name, self.cache_bytes, Arc::new(loader));
        if let Some(peers) = self.peers {
            group.register_peers(peers);
        }
        group
    }

    /// Builds the group and registers it in `registry`, replacing any group of the same name.
    pub fn register(self, registry: &GroupRegistry, loader: impl Loader + 'static) -> Arc<Group> {
        registry.register(self.build(loader))
    }
}

impl Debug for GroupBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupBuilder")
            .field("name", &self.name)
            .field("cache_bytes", &self.cache_bytes)
            .field("peers", &self.peers.is_some())
            .finish()
    }
}
