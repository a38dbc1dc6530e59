// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! An embeddable distributed cache.
//!
//! A set of cooperating processes ("peers") share the job of caching values that are expensive
//! to produce. Each key is owned by exactly one peer, chosen by consistent hashing over the
//! peer names. A process that misses a key asks the owner for it; the owner loads it once
//! through a user-supplied [`Loader`] and keeps it in its byte-bounded LRU cache.
//!
//! # Overview
//!
//! - [`Group`] is a named cache namespace: a local cache, a loader and optionally a
//!   [`PeerPicker`]. [`Group::get`] is the only lookup operation.
//! - [`GroupRegistry`] indexes groups by name, for transports that serve peer requests.
//! - [`PeerPool`] is the consistent-hash [`PeerPicker`]. It turns peer names into
//!   [`PeerFetcher`]s through a caller-supplied `connect` function, so it works with any
//!   transport.
//! - [`ByteView`] is the immutable value type handed out by groups.
//! - [`LocalCache`] is the thread-safe, byte-bounded LRU each group keeps its values in.
//!
//! # Lookup Flow
//!
//! 1. The local cache is checked. A hit returns immediately.
//! 2. On a miss, concurrent callers for the same key are collapsed so the remaining steps run
//!    once.
//! 3. If a peer picker is registered and names a remote owner, the value is fetched from it and
//!    returned without being cached locally. If that fetch fails, a warning is logged and the
//!    lookup continues with step 4.
//! 4. The loader produces the value, which is stored in the local cache and returned.
//!
//! # Quick Start
//!
//! ```
//! use peercache::{GroupRegistry, loader_fn};
//!
//! let registry = GroupRegistry::new();
//! let scores = registry.new_group("scores", 2 << 10, loader_fn(|key| match key {
//!     "Tom" => Ok(b"630".to_vec()),
//!     "Jack" => Ok(b"589".to_vec()),
//!     _ => Err(format!("{key} not exist").into()),
//! }));
//!
//! assert_eq!(scores.get("Tom")?.as_string(), "630");
//!
//! // The second lookup is served from the local cache.
//! assert_eq!(scores.get("Tom")?.as_string(), "630");
//! assert_eq!(scores.stats().cache_hits, 1);
//! # Ok::<(), peercache::Error>(())
//! ```
//!
//! # Logging
//!
//! Groups, the registry and the pool emit [`tracing`] events. Group events are named
//! `cache.event` and carry `cache.group`, `cache.key` and `cache.activity` fields; failed peer
//! fetches are logged at `WARN`, failed loads at `INFO`, everything else at `DEBUG`. Nothing is
//! recorded unless the host installs a subscriber.
//!
//! # Blocking
//!
//! Lookups block the calling thread while a loader or peer fetch runs, and callers that join
//! another caller's load wait for it without a deadline. Loaders and fetchers that perform I/O
//! should bound it with their own timeouts.

mod byteview;
mod cache;
mod error;
mod group;
mod peers;
mod pool;
mod registry;
mod stats;
mod telemetry;

#[doc(inline)]
pub use byteview::ByteView;
#[doc(inline)]
pub use cache::LocalCache;
#[doc(inline)]
pub use error::{BoxError, Error, Result};
#[doc(inline)]
pub use group::{Group, GroupBuilder};
#[doc(inline)]
pub use peercache_ring::HashFn;
#[doc(inline)]
pub use peers::{Loader, PeerFetcher, PeerPicker, loader_fn};
#[doc(inline)]
pub use pool::{PeerPool, PeerPoolBuilder};
#[doc(inline)]
pub use registry::GroupRegistry;
#[doc(inline)]
pub use stats::{CacheStats, GroupStatsSnapshot};
