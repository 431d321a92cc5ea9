//! Statistics tracking for the allocator

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where `acquire` found its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AcquireSource {
    RecycleBin,
    Usable,
    Created,
}

/// Live counters, updated without taking the allocator lock
#[derive(Debug, Default)]
pub(crate) struct AllocatorStats {
    recycled: AtomicU64,
    reused: AtomicU64,
    created: AtomicU64,
    releases: AtomicU64,
    exhausted_releases: AtomicU64,
    exhaustion_retries: AtomicU64,
    retry_limit_hits: AtomicU64,
    fatal_failures: AtomicU64,
    resets: AtomicU64,
    destroyed: AtomicU64,
    live_handles: AtomicUsize,
    peak_live_handles: AtomicUsize,
}

impl AllocatorStats {
    pub(crate) fn record_acquire(&self, source: AcquireSource) {
        let counter = match source {
            AcquireSource::RecycleBin => &self.recycled,
            AcquireSource::Usable => &self.reused,
            AcquireSource::Created => &self.created,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let live = self.live_handles.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_live_handles.fetch_max(live, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self, exhausted: bool) {
        if exhausted {
            self.exhausted_releases.fetch_add(1, Ordering::Relaxed);
        } else {
            self.releases.fetch_add(1, Ordering::Relaxed);
        }
        self.live_handles.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn record_retry(&self) {
        self.exhaustion_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry_limit(&self) {
        self.retry_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fatal(&self) {
        self.fatal_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_resets(&self, count: usize) {
        self.resets.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_destroyed(&self, count: usize) {
        self.destroyed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::Acquire)
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            recycled: self.recycled.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            exhausted_releases: self.exhausted_releases.load(Ordering::Relaxed),
            exhaustion_retries: self.exhaustion_retries.load(Ordering::Relaxed),
            retry_limit_hits: self.retry_limit_hits.load(Ordering::Relaxed),
            fatal_failures: self.fatal_failures.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            live_handles: self.live_handles.load(Ordering::Acquire),
            peak_live_handles: self.peak_live_handles.load(Ordering::Relaxed),
        }
    }
}

/// Allocator statistics at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatsSnapshot {
    /// Acquisitions served from the recycle bin.
    pub recycled: u64,
    /// Acquisitions served from the current slot's usable bucket.
    pub reused: u64,
    /// Acquisitions that created a new pool.
    pub created: u64,
    /// Pools returned with spare capacity.
    pub releases: u64,
    /// Pools retired as exhausted.
    pub exhausted_releases: u64,
    pub exhaustion_retries: u64,
    pub retry_limit_hits: u64,
    pub fatal_failures: u64,
    /// Whole-pool resets issued by frame advances.
    pub resets: u64,
    /// Pools destroyed at teardown.
    pub destroyed: u64,
    pub live_handles: usize,
    pub peak_live_handles: usize,
}

impl StatsSnapshot {
    /// Total successful `acquire` calls, including replacements taken during retries.
    pub fn acquisitions(&self) -> u64 {
        self.recycled + self.reused + self.created
    }

    /// Share of acquisitions that did not need a new pool (0.0 - 1.0)
    pub fn reuse_rate(&self) -> f64 {
        let total = self.acquisitions();
        if total == 0 {
            0.0
        } else {
            (self.recycled + self.reused) as f64 / total as f64
        }
    }
}
