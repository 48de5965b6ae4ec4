//! Per-producer push-latency statistics.
//!
//! Producer threads record every push with start/end cycle stamps and the
//! queue depth they observed before pushing. All fields the producers touch
//! are atomics; sample rings race benignly (a lost sample is acceptable).
//! The report side copies, sorts, and prints from the consumer thread only.

use crate::timebase::Timebase;
use quotearb_core::Venue;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Slots in the producer table. Linear scan; venue count is small.
pub const MAX_PRODUCERS: usize = Venue::COUNT;
/// Samples retained per producer for percentile calculation.
pub const SAMPLE_CAPACITY: usize = 10_000;

/// Sentinel tag for an unclaimed producer slot.
const SLOT_FREE: u64 = u64::MAX;

/// Fixed histogram bucket upper bounds in nanoseconds; the last bucket is
/// open-ended.
const BUCKET_BOUNDS_NS: [u64; 7] = [50, 100, 250, 500, 1_000, 5_000, 10_000];
const BUCKET_LABELS: [&str; 8] = [
    "    <50ns", " 50-100ns", "100-250ns", "250-500ns", " 0.5-1us ", "  1-5us  ",
    "  5-10us ", "   >10us ",
];
const HISTOGRAM_BAR_WIDTH: usize = 40;

struct ProducerStats {
    /// Venue id, or `SLOT_FREE` until a producer claims the slot.
    venue: AtomicU64,
    count: AtomicU64,
    total_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
    occ_total: AtomicU64,
    occ_min: AtomicU64,
    occ_max: AtomicU64,
    sample_index: AtomicUsize,
    latency_samples: Vec<AtomicU64>,
    occupancy_samples: Vec<AtomicU64>,
}

impl ProducerStats {
    fn new() -> Self {
        Self {
            venue: AtomicU64::new(SLOT_FREE),
            count: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
            occ_total: AtomicU64::new(0),
            occ_min: AtomicU64::new(u64::MAX),
            occ_max: AtomicU64::new(0),
            sample_index: AtomicUsize::new(0),
            latency_samples: (0..SAMPLE_CAPACITY).map(|_| AtomicU64::new(0)).collect(),
            occupancy_samples: (0..SAMPLE_CAPACITY).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn record(&self, latency_ns: u64, occupancy: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(latency_ns, Ordering::Relaxed);
        update_min(&self.min_ns, latency_ns);
        update_max(&self.max_ns, latency_ns);

        self.occ_total.fetch_add(occupancy, Ordering::Relaxed);
        update_min(&self.occ_min, occupancy);
        update_max(&self.occ_max, occupancy);

        // Writers race on ring slots; any torn interleaving just loses a
        // sample, which is acceptable for percentile telemetry.
        let idx = self.sample_index.fetch_add(1, Ordering::Relaxed) % SAMPLE_CAPACITY;
        self.latency_samples[idx].store(latency_ns, Ordering::Relaxed);
        self.occupancy_samples[idx].store(occupancy, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.total_ns.store(0, Ordering::Relaxed);
        self.min_ns.store(u64::MAX, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
        self.occ_total.store(0, Ordering::Relaxed);
        self.occ_min.store(u64::MAX, Ordering::Relaxed);
        self.occ_max.store(0, Ordering::Relaxed);
        self.sample_index.store(0, Ordering::Relaxed);
    }

    fn used_samples(&self) -> usize {
        self.sample_index.load(Ordering::Relaxed).min(SAMPLE_CAPACITY)
    }

    fn sorted_latencies(&self) -> Vec<u64> {
        let used = self.used_samples();
        let mut samples: Vec<u64> = self.latency_samples[..used]
            .iter()
            .map(|s| s.load(Ordering::Relaxed))
            .collect();
        samples.sort_unstable();
        samples
    }
}

fn update_min(cell: &AtomicU64, value: u64) {
    let mut current = cell.load(Ordering::Relaxed);
    while value < current {
        match cell.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

fn update_max(cell: &AtomicU64, value: u64) {
    let mut current = cell.load(Ordering::Relaxed);
    while value > current {
        match cell.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Aggregate view of one producer's recorded pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerSnapshot {
    pub venue: Venue,
    pub count: u64,
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub occ_min: u64,
    pub occ_max: u64,
    pub occ_mean: u64,
}

/// Push-latency tracker, one instance per engine.
pub struct LatencyTracker {
    slots: Vec<ProducerStats>,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_PRODUCERS).map(|_| ProducerStats::new()).collect(),
        }
    }

    /// Record one push operation.
    ///
    /// `start_cycles`/`end_cycles` bracket the placement attempt;
    /// `occupancy` is the queue depth observed before the push. Samples
    /// where the counter did not advance are discarded as measurement
    /// anomalies.
    pub fn record(&self, venue: Venue, start_cycles: u64, end_cycles: u64, occupancy: usize) {
        if end_cycles <= start_cycles {
            return;
        }
        let latency_ns = Timebase::global().cycles_to_ns(end_cycles - start_cycles);
        self.slot_for(venue).record(latency_ns, occupancy as u64);
    }

    /// Find the slot for `venue`, lazily claiming a free one.
    fn slot_for(&self, venue: Venue) -> &ProducerStats {
        let tag = u64::from(venue.id());
        for slot in &self.slots {
            let current = slot.venue.load(Ordering::Acquire);
            if current == tag {
                return slot;
            }
            if current == SLOT_FREE {
                match slot.venue.compare_exchange(
                    SLOT_FREE,
                    tag,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return slot,
                    Err(actual) if actual == tag => return slot,
                    Err(_) => continue,
                }
            }
        }
        // Table full: fold overflow producers into the first slot rather
        // than losing their samples entirely.
        &self.slots[0]
    }

    /// Snapshot for one producer, if it has recorded anything.
    pub fn snapshot(&self, venue: Venue) -> Option<ProducerSnapshot> {
        let tag = u64::from(venue.id());
        let slot = self
            .slots
            .iter()
            .find(|s| s.venue.load(Ordering::Acquire) == tag)?;
        let count = slot.count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        Some(ProducerSnapshot {
            venue,
            count,
            total_ns: slot.total_ns.load(Ordering::Relaxed),
            min_ns: slot.min_ns.load(Ordering::Relaxed),
            max_ns: slot.max_ns.load(Ordering::Relaxed),
            occ_min: slot.occ_min.load(Ordering::Relaxed),
            occ_max: slot.occ_max.load(Ordering::Relaxed),
            occ_mean: slot.occ_total.load(Ordering::Relaxed) / count,
        })
    }

    /// Clear all statistics. Lets a benchmark harness discard warm-up
    /// samples taken around calibration.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.reset();
        }
    }

    /// Render the full latency report: per-producer percentile table,
    /// per-producer histogram, and occupancy summary. Called from the
    /// consumer thread only.
    pub fn format_report(&self, queue_label: &str) -> String {
        let overhead_ns = Timebase::global().read_overhead_ns();
        let mut out = String::new();

        let _ = writeln!(out, "+{}+", "-".repeat(72));
        let _ = writeln!(out, "| {:<70} |", format!("QUEUE PUSH LATENCY ({queue_label})"));
        let _ = writeln!(out, "+{}+", "-".repeat(72));
        let _ = writeln!(
            out,
            "| {:<10} | {:>9} | {:>9} | {:>9} | {:>9} | {:>9} |",
            "Producer", "Count", "Median", "Min", "Max", "P99"
        );
        let _ = writeln!(out, "+{}+", "-".repeat(72));

        for slot in self.used_slots() {
            let venue = Venue::from_id(slot.venue.load(Ordering::Acquire) as u8);
            let name = venue.map_or("?", Venue::as_str);
            let count = slot.count.load(Ordering::Relaxed);
            let sorted = slot.sorted_latencies();
            let median = percentile(&sorted, 50).saturating_sub(overhead_ns);
            let p99 = percentile(&sorted, 99).saturating_sub(overhead_ns);
            let min = slot.min_ns.load(Ordering::Relaxed).saturating_sub(overhead_ns);
            let max = slot.max_ns.load(Ordering::Relaxed).saturating_sub(overhead_ns);
            let _ = writeln!(
                out,
                "| {:<10} | {:>9} | {:>9} | {:>9} | {:>9} | {:>9} |",
                name,
                count,
                format_time(median),
                format_time(min),
                format_time(max),
                format_time(p99),
            );
        }
        let _ = writeln!(out, "+{}+", "-".repeat(72));

        for slot in self.used_slots() {
            let venue = Venue::from_id(slot.venue.load(Ordering::Acquire) as u8);
            let name = venue.map_or("?", Venue::as_str);
            let _ = writeln!(out, "\n{name} push latency distribution:");
            let used = slot.used_samples();
            let mut buckets = [0u64; BUCKET_LABELS.len()];
            for sample in &slot.latency_samples[..used] {
                let ns = sample.load(Ordering::Relaxed).saturating_sub(overhead_ns);
                buckets[bucket_index(ns)] += 1;
            }
            let peak = buckets.iter().copied().max().unwrap_or(0).max(1);
            for (label, &bucket_count) in BUCKET_LABELS.iter().zip(buckets.iter()) {
                let bar = (bucket_count as usize * HISTOGRAM_BAR_WIDTH) / peak as usize;
                let _ = writeln!(
                    out,
                    "  {label} | {:<width$} {bucket_count}",
                    "#".repeat(bar),
                    width = HISTOGRAM_BAR_WIDTH
                );
            }
        }

        let _ = writeln!(out, "\nPre-push queue occupancy:");
        let _ = writeln!(
            out,
            "| {:<10} | {:>9} | {:>9} | {:>9} |",
            "Producer", "Mean", "Min", "Max"
        );
        for slot in self.used_slots() {
            let venue = Venue::from_id(slot.venue.load(Ordering::Acquire) as u8);
            let name = venue.map_or("?", Venue::as_str);
            let count = slot.count.load(Ordering::Relaxed).max(1);
            let _ = writeln!(
                out,
                "| {:<10} | {:>9} | {:>9} | {:>9} |",
                name,
                slot.occ_total.load(Ordering::Relaxed) / count,
                slot.occ_min.load(Ordering::Relaxed),
                slot.occ_max.load(Ordering::Relaxed),
            );
        }

        out
    }

    fn used_slots(&self) -> impl Iterator<Item = &ProducerStats> {
        self.slots.iter().filter(|slot| {
            slot.venue.load(Ordering::Acquire) != SLOT_FREE
                && slot.count.load(Ordering::Relaxed) > 0
        })
    }
}

fn bucket_index(ns: u64) -> usize {
    BUCKET_BOUNDS_NS
        .iter()
        .position(|&bound| ns < bound)
        .unwrap_or(BUCKET_BOUNDS_NS.len())
}

fn percentile(sorted: &[u64], pct: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = (pct * sorted.len() / 100).min(sorted.len() - 1);
    sorted[idx]
}

/// Auto-scale a nanosecond value for display.
fn format_time(ns: u64) -> String {
    if ns < 1_000 {
        format!("{ns}ns")
    } else if ns < 1_000_000 {
        format!("{:.1}us", ns as f64 / 1_000.0)
    } else {
        format!("{:.1}ms", ns as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timebase::Timebase;

    /// Cycle stamps that convert to roughly `ns` nanoseconds.
    fn stamps(ns: u64) -> (u64, u64) {
        let cycles = Timebase::global().ns_to_cycles(ns).max(1);
        (1_000, 1_000 + cycles)
    }

    #[test]
    fn test_record_accumulates() {
        let tracker = LatencyTracker::new();
        for ns in [100, 200, 300] {
            let (start, end) = stamps(ns);
            tracker.record(Venue::Binance, start, end, 5);
        }
        let snap = tracker.snapshot(Venue::Binance).unwrap();
        assert_eq!(snap.count, 3);
        assert!(snap.min_ns <= snap.max_ns);
        assert_eq!(snap.occ_min, 5);
        assert_eq!(snap.occ_max, 5);
        assert_eq!(snap.occ_mean, 5);
    }

    #[test]
    fn test_invalid_stamps_discarded() {
        let tracker = LatencyTracker::new();
        tracker.record(Venue::Binance, 100, 100, 0);
        tracker.record(Venue::Binance, 100, 50, 0);
        assert!(tracker.snapshot(Venue::Binance).is_none());
    }

    #[test]
    fn test_producers_tracked_separately() {
        let tracker = LatencyTracker::new();
        let (start, end) = stamps(100);
        tracker.record(Venue::Binance, start, end, 1);
        tracker.record(Venue::Coinbase, start, end, 2);
        tracker.record(Venue::Coinbase, start, end, 4);

        assert_eq!(tracker.snapshot(Venue::Binance).unwrap().count, 1);
        let coinbase = tracker.snapshot(Venue::Coinbase).unwrap();
        assert_eq!(coinbase.count, 2);
        assert_eq!(coinbase.occ_mean, 3);
    }

    #[test]
    fn test_reset_clears() {
        let tracker = LatencyTracker::new();
        let (start, end) = stamps(100);
        tracker.record(Venue::Kraken, start, end, 0);
        tracker.reset();
        assert!(tracker.snapshot(Venue::Kraken).is_none());
    }

    #[test]
    fn test_sample_ring_wraps() {
        let tracker = LatencyTracker::new();
        let (start, end) = stamps(100);
        for _ in 0..SAMPLE_CAPACITY + 10 {
            tracker.record(Venue::Bybit, start, end, 0);
        }
        let snap = tracker.snapshot(Venue::Bybit).unwrap();
        assert_eq!(snap.count, (SAMPLE_CAPACITY + 10) as u64);
    }

    #[test]
    fn test_report_contains_producers() {
        let tracker = LatencyTracker::new();
        let (start, end) = stamps(150);
        tracker.record(Venue::Binance, start, end, 3);
        let report = tracker.format_report("test queue");
        assert!(report.contains("Binance"));
        assert!(report.contains("test queue"));
        assert!(report.contains("Pre-push queue occupancy"));
    }

    #[test]
    fn test_percentile_indexing() {
        let sorted: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&sorted, 50), 51);
        assert_eq!(percentile(&sorted, 99), 100);
        assert_eq!(percentile(&[], 99), 0);
    }

    #[test]
    fn test_bucket_index_boundaries() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(49), 0);
        assert_eq!(bucket_index(50), 1);
        assert_eq!(bucket_index(999), 4);
        assert_eq!(bucket_index(10_000), 7);
        assert_eq!(bucket_index(1_000_000), 7);
    }

    #[test]
    fn test_format_time_units() {
        assert_eq!(format_time(42), "42ns");
        assert_eq!(format_time(1_500), "1.5us");
        assert_eq!(format_time(2_500_000), "2.5ms");
    }
}
