//! Calibrated cycle-counter timebase.
//!
//! Latency samples are taken with the cheapest non-serialising counter read
//! available (`rdtsc` on x86_64) and converted to nanoseconds with a ratio
//! calibrated once per process against the monotonic clock. On platforms
//! without a hardware cycle counter, reads fall back to monotonic
//! nanoseconds and the ratio is exactly 1 GHz.

use std::sync::OnceLock;
use std::thread;
use std::time::Duration;
#[cfg(target_arch = "x86_64")]
use std::time::Instant;

const NS_PER_SEC: u64 = 1_000_000_000;
const CALIBRATION_SLEEP: Duration = Duration::from_millis(100);
const OVERHEAD_ITERATIONS: u64 = 1_000;

/// Read the cycle counter.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn read_cycles() -> u64 {
    // SAFETY: RDTSC has no preconditions; it only reads the timestamp counter.
    unsafe { core::arch::x86_64::_rdtsc() }
}

/// Read the cycle counter (monotonic-nanosecond fallback).
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn read_cycles() -> u64 {
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Process-wide cycles-per-second calibration and conversion.
#[derive(Debug)]
pub struct Timebase {
    freq_hz: u64,
    overhead_ns: u64,
}

impl Timebase {
    /// The calibrated process-wide timebase. First use pays the ~100 ms
    /// calibration sleep; every later call is a plain load.
    pub fn global() -> &'static Timebase {
        static TIMEBASE: OnceLock<Timebase> = OnceLock::new();
        TIMEBASE.get_or_init(Timebase::calibrate)
    }

    #[cfg(target_arch = "x86_64")]
    fn calibrate() -> Self {
        let wall_start = Instant::now();
        let start = read_cycles();
        thread::sleep(CALIBRATION_SLEEP);
        let end = read_cycles();
        let elapsed_ns = wall_start.elapsed().as_nanos().max(1) as u64;

        let cycles = end.saturating_sub(start).max(1);
        let freq_hz = (cycles as u128 * NS_PER_SEC as u128 / elapsed_ns as u128) as u64;
        let freq_hz = freq_hz.max(1);

        let overhead_ns = measure_read_overhead(freq_hz);
        tracing::debug!(freq_hz, overhead_ns, "timebase calibrated");
        Self {
            freq_hz,
            overhead_ns,
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn calibrate() -> Self {
        // Counter reads already return nanoseconds; hold the sleep so the
        // once-per-process cost is identical across platforms.
        thread::sleep(CALIBRATION_SLEEP);
        let freq_hz = NS_PER_SEC;
        let overhead_ns = measure_read_overhead(freq_hz);
        tracing::debug!(freq_hz, overhead_ns, "timebase calibrated (monotonic fallback)");
        Self {
            freq_hz,
            overhead_ns,
        }
    }

    /// Convert a cycle delta to nanoseconds. 128-bit intermediate, so
    /// deltas up to an hour do not overflow.
    #[inline]
    pub fn cycles_to_ns(&self, cycles: u64) -> u64 {
        (cycles as u128 * NS_PER_SEC as u128 / self.freq_hz as u128) as u64
    }

    /// Convert nanoseconds to a cycle count.
    #[inline]
    pub fn ns_to_cycles(&self, ns: u64) -> u64 {
        (ns as u128 * self.freq_hz as u128 / NS_PER_SEC as u128) as u64
    }

    pub fn frequency_hz(&self) -> u64 {
        self.freq_hz
    }

    /// Mean cost of a single counter read, in nanoseconds. Report
    /// generators subtract this from recorded latencies.
    pub fn read_overhead_ns(&self) -> u64 {
        self.overhead_ns
    }
}

/// Mean delta between back-to-back counter reads over a tight loop.
fn measure_read_overhead(freq_hz: u64) -> u64 {
    let mut total_cycles = 0u64;
    for _ in 0..OVERHEAD_ITERATIONS {
        let start = read_cycles();
        let end = read_cycles();
        total_cycles += end.saturating_sub(start);
    }
    let mean_cycles = total_cycles / OVERHEAD_ITERATIONS;
    (mean_cycles as u128 * NS_PER_SEC as u128 / freq_hz as u128) as u64
}
