//! Shared quote transports with push-latency instrumentation.
//!
//! Every venue producer pushes into one shared queue; the detection thread
//! drains it. Both variants stamp each push with cycle-counter start/end
//! reads and the pre-push occupancy, and hand the sample to the latency
//! tracker. The lock-free ring is the default; building with the
//! `mutex-transport` feature swaps in the mutex baseline so the two can be
//! compared under identical producer load.

use crate::error::TransportError;
use crate::ring::MpscRing;
use crate::timebase::read_cycles;
use crate::tracker::LatencyTracker;
use parking_lot::Mutex;
use quotearb_core::{Quote, WorldView};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default transport capacity. Power of two.
pub const QUEUE_CAPACITY: usize = 4096;

/// Result of a push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    /// The ring was full. Counted, never retried.
    Dropped,
}

/// Lock-free shared transport (default variant).
pub struct MpscQuoteTransport {
    queue: MpscRing<Quote>,
    tracker: Arc<LatencyTracker>,
    drop_count: AtomicU64,
}

impl MpscQuoteTransport {
    pub const QUEUE_LABEL: &'static str = "MPSC lock-free";

    pub fn new(tracker: Arc<LatencyTracker>) -> Result<Self, TransportError> {
        Self::with_capacity(QUEUE_CAPACITY, tracker)
    }

    pub fn with_capacity(
        capacity: usize,
        tracker: Arc<LatencyTracker>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            queue: MpscRing::with_capacity(capacity)?,
            tracker,
            drop_count: AtomicU64::new(0),
        })
    }

    /// Push from any producer thread. Never blocks; a full ring drops the
    /// quote and bumps the drop counter.
    pub fn push(&self, quote: Quote) -> PushOutcome {
        let venue = quote.venue;
        let occupancy = self.queue.len();
        let start = read_cycles();
        let result = self.queue.try_push(quote);
        let end = read_cycles();
        self.tracker.record(venue, start, end, occupancy);

        match result {
            Ok(()) => PushOutcome::Enqueued,
            Err(_) => {
                self.drop_count.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Dropped
            }
        }
    }

    /// Drain every readable slot into the world view. Consumer thread only;
    /// stops as soon as the ring is observed empty.
    pub fn drain_all(&self, world: &mut WorldView) -> usize {
        let mut drained = 0;
        while let Some(quote) = self.queue.try_pop() {
            world.apply(quote);
            drained += 1;
        }
        drained
    }

    /// Approximate occupancy.
    pub fn size_estimate(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn drop_count(&self) -> u64 {
        self.drop_count.load(Ordering::Relaxed)
    }

    pub fn tracker(&self) -> &LatencyTracker {
        &self.tracker
    }

    /// Latency report plus drop accounting.
    pub fn latency_report(&self) -> String {
        let mut report = self.tracker.format_report(Self::QUEUE_LABEL);
        let drops = self.drop_count();
        if drops > 0 {
            let _ = writeln!(report, "\nQueue drops (ring full): {drops}");
        }
        report
    }
}

/// Mutex-guarded baseline transport.
///
/// A plain FIFO behind one lock. Never drops; exists as the latency
/// baseline the lock-free variant is measured against.
pub struct MutexQuoteTransport {
    queue: Mutex<VecDeque<Quote>>,
    tracker: Arc<LatencyTracker>,
}

impl MutexQuoteTransport {
    pub const QUEUE_LABEL: &'static str = "mutex baseline";

    pub fn new(tracker: Arc<LatencyTracker>) -> Result<Self, TransportError> {
        Self::with_capacity(QUEUE_CAPACITY, tracker)
    }

    pub fn with_capacity(
        capacity: usize,
        tracker: Arc<LatencyTracker>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            tracker,
        })
    }

    /// Push from any producer thread. The timed window spans the whole
    /// acquire/append/release, so lock contention shows up in the numbers.
    pub fn push(&self, quote: Quote) -> PushOutcome {
        let venue = quote.venue;
        let start = read_cycles();
        let occupancy;
        {
            let mut queue = self.queue.lock();
            occupancy = queue.len();
            queue.push_back(quote);
        }
        let end = read_cycles();
        self.tracker.record(venue, start, end, occupancy);
        PushOutcome::Enqueued
    }

    /// Take the lock once and move everything out.
    pub fn drain_all(&self, world: &mut WorldView) -> usize {
        let mut queue = self.queue.lock();
        let drained = queue.len();
        for quote in queue.drain(..) {
            world.apply(quote);
        }
        drained
    }

    pub fn size_estimate(&self) -> usize {
        self.queue.lock().len()
    }

    /// The baseline never drops.
    pub fn drop_count(&self) -> u64 {
        0
    }

    pub fn tracker(&self) -> &LatencyTracker {
        &self.tracker
    }

    pub fn latency_report(&self) -> String {
        self.tracker.format_report(Self::QUEUE_LABEL)
    }
}

/// Transport variant selected at build time. The engine is agnostic.
#[cfg(feature = "mutex-transport")]
pub type SharedQuoteTransport = MutexQuoteTransport;
#[cfg(not(feature = "mutex-transport"))]
pub type SharedQuoteTransport = MpscQuoteTransport;
