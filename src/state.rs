use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering::*};

use crossbeam::utils::CachePadded;

/// Completion signal and counters shared by every stage of one run.
///
/// Owned by the orchestrator and lent to each component; the producer is the
/// only writer of `total` and `finished`.
#[derive(Debug, Default)]
pub struct SharedState {
    in_flight: CachePadded<AtomicI64>,
    finished: CachePadded<AtomicBool>,
    aborted: AtomicBool,
    total: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// One more item is on its way to a consumer.
    #[inline]
    pub fn admit(&self) {
        self.in_flight.fetch_add(1, AcqRel);
    }

    /// A consumer is done with one item, whether or not its result survived.
    #[inline]
    pub fn complete(&self) {
        self.in_flight.fetch_sub(1, AcqRel);
    }

    /// May be transiently negative: a consumer can finish an item before the
    /// producer got around to counting it. Never negative once `is_finished`.
    #[inline]
    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Acquire)
    }

    /// Stores the total, then releases every earlier producer write to any
    /// thread that observes `is_finished() == true`.
    pub fn publish_finished(&self, total: u64) {
        self.total.store(total, Relaxed);
        self.finished.store(true, Release);
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Acquire)
    }

    /// Only meaningful after `is_finished` returned true.
    pub fn total(&self) -> u64 {
        self.total.load(Relaxed)
    }

    pub fn is_drained(&self) -> bool {
        self.is_finished() && self.in_flight() == 0
    }

    /// A worker died; everyone else should stop waiting for it.
    pub fn abort(&self) {
        self.aborted.store(true, Release);
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Acquire)
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Relaxed);
    }

    /// Items the producer could not enqueue.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Relaxed)
    }

    /// Results a consumer could not enqueue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Relaxed)
    }
}
