// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    pub(crate) fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct GroupStats {
    pub(crate) gets: Counter,
    pub(crate) cache_hits: Counter,
    pub(crate) peer_loads: Counter,
    pub(crate) peer_errors: Counter,
    pub(crate) loads: Counter,
    pub(crate) loads_deduped: Counter,
    pub(crate) local_loads: Counter,
    pub(crate) local_load_errs: Counter,
}

impl GroupStats {
    pub(crate) fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            gets: self.gets.get(),
            cache_hits: self.cache_hits.get(),
            peer_loads: self.peer_loads.get(),
            peer_errors: self.peer_errors.get(),
            loads: self.loads.get(),
            loads_deduped: self.loads_deduped.get(),
            local_loads: self.local_loads.get(),
            local_load_errs: self.local_load_errs.get(),
        }
    }
}

/// Point-in-time counters of a [`Group`](crate::Group).
///
/// Counters are read one at a time while other threads keep updating them, so a snapshot taken
/// under load is not guaranteed to be internally consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct GroupStatsSnapshot {
    /// Lookups with a non-empty key.
    pub gets: u64,
    /// Lookups answered from the local cache.
    pub cache_hits: u64,
    /// Values fetched successfully from a remote peer.
    pub peer_loads: u64,
    /// Remote fetches that failed and fell back to a local load.
    pub peer_errors: u64,
    /// Lookups that missed the cache, including those that joined another caller's load.
    pub loads: u64,
    /// Loads that actually ran after deduplication.
    pub loads_deduped: u64,
    /// Successful calls to the group's loader.
    pub local_loads: u64,
    /// Failed calls to the group's loader.
    pub local_load_errs: u64,
}

/// Point-in-time counters of a group's local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct CacheStats {
    /// Bytes currently charged against the budget.
    pub bytes: usize,
    /// Entries currently cached.
    pub items: usize,
    /// Lookups against the cache.
    pub gets: u64,
    /// Lookups that found an entry.
    pub hits: u64,
    /// Entries removed to stay within the byte budget.
    pub evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_copies_counters() {
        let stats = GroupStats::default();
        stats.gets.increment();
        stats.gets.increment();
        stats.peer_errors.increment();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.gets, 2);
        assert_eq!(snapshot.peer_errors, 1);
        assert_eq!(snapshot.local_loads, 0);

        stats.gets.increment();
        assert_eq!(snapshot.gets, 2);
    }
}
