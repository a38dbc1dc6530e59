// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A least-recently-used store bounded by a byte budget.
//!
//! This crate provides [`LruStore`], the storage engine underneath a peercache group. Unlike
//! count-bounded caches, the budget is expressed in bytes: every entry is charged
//! `key.len() + value.byte_len()` bytes, where the value size comes from the [`ByteLen`] trait.
//!
//! When an insertion pushes the total over the budget, entries are evicted from the
//! least-recently-used end until the store fits again. An optional [`EvictionObserver`]
//! is told about every evicted entry before it is dropped.
//!
//! # Example
//!
//! ```
//! use peercache_lru::LruStore;
//!
//! // Room for two entries of one-byte keys and one-byte values.
//! let mut store = LruStore::<Vec<u8>>::new(4);
//!
//! store.add("a", vec![1]);
//! store.add("b", vec![2]);
//!
//! // Touching "a" makes "b" the eviction candidate.
//! assert!(store.get("a").is_some());
//!
//! store.add("c", vec![3]);
//! assert!(store.contains("a"));
//! assert!(!store.contains("b"));
//! assert_eq!(store.bytes(), 4);
//! ```
//!
//! # Unbounded Stores
//!
//! A budget of `0` disables eviction entirely. The store then grows without limit and
//! [`LruStore::remove_oldest`] is the only way entries leave it, apart from explicit removal.
//!
//! # Thread Safety
//!
//! [`LruStore`] is a single-owner structure: every operation, including [`LruStore::get`],
//! takes `&mut self` because reads reorder the recency list. Wrap it in a lock to share it.

mod list;
mod store;
mod weight;

#[doc(inline)]
pub use store::{EvictionObserver, LruStore};
#[doc(inline)]
pub use weight::ByteLen;
