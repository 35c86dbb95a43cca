//! Looper statistics.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters describing what a Looper has done.
///
/// Counters are updated without a lock; every accessor returns a snapshot.
#[derive(Debug, Default)]
pub struct LooperStats {
    /// Total tasks accepted by `post`.
    posted: AtomicUsize,
    /// Total tasks executed by the worker.
    executed: AtomicUsize,
    /// Total tasks withdrawn with `cancel`.
    cancelled: AtomicUsize,
    /// Total queued tasks dropped by a discarding shutdown.
    discarded: AtomicUsize,
    /// Total posts rejected because the Looper was stopped.
    rejected: AtomicUsize,
    /// Total event firings skipped because their owner was gone.
    stale_events: AtomicUsize,
    /// Total tasks that panicked while running.
    panicked: AtomicUsize,
}

impl LooperStats {
    /// Record an accepted post.
    #[inline]
    pub fn record_posted(&self) {
        self.posted.fetch_add(1, Ordering::SeqCst);
    }

    /// Record an executed task.
    #[inline]
    pub fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a cancelled task.
    #[inline]
    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    /// Record tasks discarded at shutdown.
    #[inline]
    pub fn record_discarded(
        &self,
        count: usize,
    ) {
        self.discarded.fetch_add(count, Ordering::SeqCst);
    }

    /// Record a rejected post.
    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a skipped stale event.
    #[inline]
    pub fn record_stale_event(&self) {
        self.stale_events.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a panicking task.
    #[inline]
    pub fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::SeqCst);
    }

    /// Tasks accepted so far.
    #[inline]
    pub fn posted(&self) -> usize {
        self.posted.load(Ordering::SeqCst)
    }

    /// Tasks executed so far.
    #[inline]
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    /// Tasks cancelled so far.
    #[inline]
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Tasks discarded so far.
    #[inline]
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    /// Posts rejected so far.
    #[inline]
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Stale event firings skipped so far.
    #[inline]
    pub fn stale_events(&self) -> usize {
        self.stale_events.load(Ordering::SeqCst)
    }

    /// Tasks that panicked so far.
    #[inline]
    pub fn panicked(&self) -> usize {
        self.panicked.load(Ordering::SeqCst)
    }
}
