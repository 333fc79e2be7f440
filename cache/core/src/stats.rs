//! Per-group statistics.
//!
//! Counters are monotonic and lock-free; readers take point-in-time
//! snapshots. `AtomicU64` keeps the 8-byte alignment the counters need on
//! 32-bit platforms.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// A monotonic counter updated with atomic operations.
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn increment(&self) {
        self.add(1);
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for one group.
#[derive(Debug, Default)]
pub struct Stats {
    /// Any get request, including those arriving from peers.
    pub gets: AtomicCounter,
    /// Hits in either the main or the hot segment.
    pub cache_hits: AtomicCounter,
    /// Remote loads or remote cache hits (non-error).
    pub peer_loads: AtomicCounter,
    /// Failed remote fetches, recovered by loading locally.
    pub peer_errors: AtomicCounter,
    /// Gets that missed the local cache (`gets - cache_hits`).
    pub loads: AtomicCounter,
    /// Loads that survived flight collapsing.
    pub loads_deduped: AtomicCounter,
    /// Successful local loads through the user loader.
    pub local_loads: AtomicCounter,
    /// Failed local loads through the user loader.
    pub local_load_errs: AtomicCounter,
    /// Gets served over the network to peers.
    pub server_requests: AtomicCounter,
}

impl Stats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.get(),
            cache_hits: self.cache_hits.get(),
            peer_loads: self.peer_loads.get(),
            peer_errors: self.peer_errors.get(),
            loads: self.loads.get(),
            loads_deduped: self.loads_deduped.get(),
            local_loads: self.local_loads.get(),
            local_load_errs: self.local_load_errs.get(),
            server_requests: self.server_requests.get(),
        }
    }
}

/// Point-in-time copy of a group's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub gets: u64,
    pub cache_hits: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub loads: u64,
    pub loads_deduped: u64,
    pub local_loads: u64,
    pub local_load_errs: u64,
    pub server_requests: u64,
}

/// Point-in-time statistics for one cache segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub bytes: u64,
    pub items: u64,
    pub gets: u64,
    pub hits: u64,
    pub evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = AtomicCounter::new();
        counter.increment();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_snapshot_copies_values() {
        let stats = Stats::default();
        stats.gets.add(3);
        stats.cache_hits.increment();

        let snap = stats.snapshot();
        assert_eq!(snap.gets, 3);
        assert_eq!(snap.cache_hits, 1);

        // Snapshots are detached from the live counters.
        stats.gets.increment();
        assert_eq!(snap.gets, 3);
    }
}
