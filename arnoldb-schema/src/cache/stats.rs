//! Schema cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics about schema cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing in the cache.
    pub misses: u64,
    /// Misses that waited on another caller's remote fetch instead of issuing their own.
    pub coalesced: u64,
    /// Remote fetches issued by the cache.
    pub remote_fetches: u64,
    /// Completed full builds.
    pub builds: u64,
}

impl SchemaStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    remote_fetches: AtomicU64,
    builds: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn lookup(&self, found: bool) {
        if found {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn remote_fetch(&self) {
        self.remote_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SchemaStats {
        SchemaStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            remote_fetches: self.remote_fetches.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
        }
    }
}
