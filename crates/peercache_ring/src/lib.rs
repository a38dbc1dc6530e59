// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Consistent hashing for assigning keys to peers.
//!
//! [`HashRing`] places every peer on a 32-bit ring many times over ("virtual nodes") and
//! assigns a key to the first virtual node at or after the key's own hash, wrapping around
//! past the top of the ring. Compared with `hash % peers`, adding or removing a peer only
//! moves the keys adjacent to that peer's virtual nodes instead of reshuffling everything.
//!
//! Every process that participates in the same cache must build its ring from the same peer
//! names, replica count and hash function, otherwise the processes disagree about ownership.
//!
//! # Example
//!
//! ```
//! use peercache_ring::HashRing;
//!
//! let mut ring = HashRing::default();
//! ring.add(["http://10.0.0.1:8000", "http://10.0.0.2:8000", "http://10.0.0.3:8000"]);
//!
//! let owner = ring.get("user:42").expect("ring has peers");
//! assert!(owner.starts_with("http://10.0.0."));
//!
//! // The same key always maps to the same peer.
//! assert_eq!(ring.get("user:42"), Some(owner));
//! ```

use std::fmt::Debug;
use std::sync::Arc;

/// Number of virtual nodes per peer used by [`HashRing::default`].
pub const DEFAULT_REPLICAS: usize = 50;

/// Hash function that positions keys and virtual nodes on the ring.
pub type HashFn = fn(&[u8]) -> u32;

/// CRC-32C (Castagnoli) checksum, the default ring hash.
#[must_use]
pub fn crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

#[derive(Clone, Debug)]
struct VirtualNode {
    hash: u32,
    peer: Arc<str>,
}

/// A consistent-hash ring mapping keys to peer names.
///
/// Each peer contributes `replicas` virtual nodes, whose positions are the hashes of
/// `"{replica}-{peer}"` for `replica` in `0..replicas`. The ring is kept sorted by position;
/// when two virtual nodes collide, the one with the smaller peer name sorts first so that
/// every process resolves the collision the same way.
#[derive(Clone)]
pub struct HashRing {
    replicas: usize,
    hash: HashFn,
    nodes: Vec<VirtualNode>,
    peers: Vec<Arc<str>>,
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS, crc32c)
    }
}

impl Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("peers", &self.peers)
            .field("virtual_nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl HashRing {
    /// Creates an empty ring with `replicas` virtual nodes per peer and a custom hash.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is 0.
    #[must_use]
    pub fn new(replicas: usize, hash: HashFn) -> Self {
        assert!(replicas > 0, "replicas must be at least 1");
        Self {
            replicas,
            hash,
            nodes: Vec::new(),
            peers: Vec::new(),
        }
    }

    /// Creates an empty ring with `replicas` virtual nodes per peer and the CRC-32C hash.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is 0.
    #[must_use]
    pub fn with_replicas(replicas: usize) -> Self {
        Self::new(replicas, crc32c)
    }

    /// Adds peers to the ring. Peers that are already present are skipped.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            if self.peers.iter().any(|existing| &**existing == peer) {
                continue;
            }

            let peer: Arc<str> = Arc::from(peer);
            for replica in 0..self.replicas {
                let hash = (self.hash)(format!("{replica}-{peer}").as_bytes());
                self.nodes.push(VirtualNode {
                    hash,
                    peer: Arc::clone(&peer),
                });
            }
            self.peers.push(peer);
        }

        self.nodes
            .sort_unstable_by(|a, b| a.hash.cmp(&b.hash).then_with(|| a.peer.cmp(&b.peer)));
    }

    /// Removes a peer and all of its virtual nodes. Returns `false` if it was not present.
    pub fn remove(&mut self, peer: &str) -> bool {
        let before = self.peers.len();
        self.peers.retain(|existing| &**existing != peer);
        if self.peers.len() == before {
            return false;
        }

        self.nodes.retain(|node| &*node.peer != peer);
        true
    }

    /// Removes every peer, keeping the replica count and hash function.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.peers.clear();
    }

    /// Returns the peer that owns `key`, or `None` if the ring is empty.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let hash = (self.hash)(key.as_bytes());
        let idx = self.nodes.partition_point(|node| node.hash < hash);

        self.nodes
            .get(idx)
            .or_else(|| self.nodes.first())
            .map(|node| &*node.peer)
    }

    /// Returns the peers on the ring, in the order they were added.
    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.peers.iter().map(|peer| &**peer)
    }

    /// Returns the number of peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if the ring has no peers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Returns the number of virtual nodes per peer.
    #[must_use]
    pub fn replicas(&self) -> usize {
        self.replicas
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    /// Treats the decimal digits of the input as its hash, so `"1-6"` lands at 16.
    fn digits(data: &[u8]) -> u32 {
        let text: String = std::str::from_utf8(data)
            .unwrap()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        text.parse().unwrap()
    }

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(HashRing: Send, Sync, Clone);
    }

    #[test]
    fn lookups_follow_ring_order_and_wrap() {
        let mut ring = HashRing::new(3, digits);
        // Positions: 2, 4, 6, 12, 14, 16, 22, 24, 26.
        ring.add(["6", "4", "2"]);

        let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")];
        for (key, owner) in cases {
            assert_eq!(ring.get(key), Some(owner), "key {key}");
        }

        // Adds 8, 18, 28.
        ring.add(["8"]);
        assert_eq!(ring.get("27"), Some("8"));

        let cases = [("2", "2"), ("11", "2"), ("23", "4")];
        for (key, owner) in cases {
            assert_eq!(ring.get(key), Some(owner), "key {key}");
        }
    }

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = HashRing::default();
        assert!(ring.is_empty());
        assert_eq!(ring.get("anything"), None);
    }

    #[test]
    fn adding_existing_peer_is_noop() {
        let mut ring = HashRing::new(3, digits);
        ring.add(["2"]);
        ring.add(["2"]);

        assert_eq!(ring.len(), 1);
        assert_eq!(ring.nodes.len(), 3);
    }

    #[test]
    fn remove_drops_virtual_nodes() {
        let mut ring = HashRing::new(3, digits);
        ring.add(["2", "4"]);

        assert!(ring.remove("2"));
        assert!(!ring.remove("2"));
        assert_eq!(ring.peers().collect::<Vec<_>>(), ["4"]);
        assert_eq!(ring.get("3"), Some("4"));
        assert_eq!(ring.nodes.len(), 3);
    }

    #[test]
    fn colliding_positions_resolve_by_peer_name() {
        fn constant(_: &[u8]) -> u32 {
            7
        }

        let mut forward = HashRing::new(1, constant);
        forward.add(["b", "a"]);
        let mut backward = HashRing::new(1, constant);
        backward.add(["a", "b"]);

        assert_eq!(forward.get("key"), Some("a"));
        assert_eq!(backward.get("key"), Some("a"));
    }

    #[test]
    fn clear_empties_ring() {
        let mut ring = HashRing::new(3, digits);
        ring.add(["2", "4"]);
        ring.clear();

        assert!(ring.is_empty());
        assert_eq!(ring.get("3"), None);
        assert_eq!(ring.replicas(), 3);
    }

    #[test]
    #[should_panic]
    fn zero_replicas_rejected() {
        let _ = HashRing::with_replicas(0);
    }

    #[test]
    fn default_uses_crc32c() {
        let ring = HashRing::default();
        assert_eq!(ring.replicas(), DEFAULT_REPLICAS);
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn debug_lists_peers() {
        let mut ring = HashRing::with_replicas(2);
        ring.add(["alpha"]);
        let debug = format!("{ring:?}");
        assert!(debug.contains("alpha"));
        assert!(debug.contains("virtual_nodes: 2"));
    }
}
