//! Detection engine lifecycle.
//!
//! Producers hand quotes to `push_quote` from any thread; one dedicated
//! detection thread drains the transport into the world view, runs the
//! scan, and atomically replaces the published opportunity snapshot.
//! Readers pull the snapshot through a short-held lock and never touch the
//! detection thread's state.

use crate::detector::{detect_opportunities, DetectorConfig};
use parking_lot::Mutex;
use quotearb_core::{now_ms, Opportunity, Quote, WorldView};
use quotearb_transport::{
    LatencyTracker, PushOutcome, SharedQuoteTransport, TransportError,
};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors that prevent the engine from running.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to spawn detection thread: {0}")]
    Spawn(#[from] std::io::Error),
}

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;
const STATE_STOPPED: u8 = 3;

/// Engine parameters. Fixed once `start` is called.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    /// Sleep between detection passes.
    pub interval: Duration,
    /// Cadence at which the latency report is printed.
    pub report_interval: Duration,
    /// Self-terminate after this many reports. 0 = unlimited.
    pub max_reports: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            interval: Duration::from_millis(100),
            report_interval: Duration::from_secs(10),
            max_reports: 0,
        }
    }
}

type ShutdownHook = Box<dyn FnOnce() + Send>;

struct EngineShared {
    transport: SharedQuoteTransport,
    state: AtomicU8,
    opportunities: Mutex<Arc<Vec<Opportunity>>>,
    pass_count: AtomicU64,
    opportunity_count: AtomicU64,
    shutdown_hook: Mutex<Option<ShutdownHook>>,
}

/// The detection engine.
pub struct ArbEngine {
    shared: Arc<EngineShared>,
    config: Mutex<EngineConfig>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ArbEngine {
    /// Build an engine with its own latency tracker and the default
    /// transport capacity.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_tracker(Arc::new(LatencyTracker::new()))
    }

    /// Build an engine around an injected tracker (shared with a benchmark
    /// harness, for example).
    pub fn with_tracker(tracker: Arc<LatencyTracker>) -> Result<Self, EngineError> {
        let transport = SharedQuoteTransport::new(tracker)?;
        Ok(Self {
            shared: Arc::new(EngineShared {
                transport,
                state: AtomicU8::new(STATE_CREATED),
                opportunities: Mutex::new(Arc::new(Vec::new())),
                pass_count: AtomicU64::new(0),
                opportunity_count: AtomicU64::new(0),
                shutdown_hook: Mutex::new(None),
            }),
            config: Mutex::new(EngineConfig::default()),
            thread: Mutex::new(None),
        })
    }

    /// Forward a quote into the transport. Thread-safe, non-blocking;
    /// a full transport drops the quote and the drop is counted.
    #[inline]
    pub fn push_quote(&self, quote: Quote) -> PushOutcome {
        self.shared.transport.push(quote)
    }

    /// Snapshot of the most recently published opportunity list. Every
    /// element belongs to a single completed detection pass.
    pub fn opportunities(&self) -> Arc<Vec<Opportunity>> {
        self.shared.opportunities.lock().clone()
    }

    pub fn set_min_profit_bps(&self, min_profit_bps: f64) {
        self.configure(|config| config.detector.min_profit_bps = min_profit_bps);
    }

    pub fn set_max_age_skew_ms(&self, max_age_skew_ms: u64) {
        self.configure(|config| config.detector.max_age_skew_ms = max_age_skew_ms);
    }

    pub fn set_interval(&self, interval: Duration) {
        self.configure(|config| config.interval = interval);
    }

    pub fn set_report_interval(&self, report_interval: Duration) {
        self.configure(|config| config.report_interval = report_interval);
    }

    pub fn set_max_reports(&self, max_reports: u32) {
        self.configure(|config| config.max_reports = max_reports);
    }

    /// Register a hook invoked once when `max_reports` is reached.
    pub fn set_shutdown_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *self.shared.shutdown_hook.lock() = Some(Box::new(hook));
    }

    fn configure(&self, apply: impl FnOnce(&mut EngineConfig)) {
        if self.state() != STATE_CREATED {
            debug!("engine configuration ignored after start");
            return;
        }
        apply(&mut self.config.lock());
    }

    /// Spawn the detection thread. Valid only from the created state; any
    /// later call is a no-op.
    pub fn start(&self) -> Result<(), EngineError> {
        if self
            .shared
            .state
            .compare_exchange(
                STATE_CREATED,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            debug!("engine start ignored: already started");
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let config = self.config.lock().clone();
        let handle = thread::Builder::new()
            .name("quotearb-detect".into())
            .spawn(move || run_loop(&shared, &config))
            .map_err(|e| {
                self.shared.state.store(STATE_STOPPED, Ordering::Release);
                EngineError::Spawn(e)
            })?;
        *self.thread.lock() = Some(handle);
        info!(
            queue = SharedQuoteTransport::QUEUE_LABEL,
            "detection engine started"
        );
        Ok(())
    }

    /// Signal termination, join the detection thread, and print a final
    /// latency report. Safe from any state; idempotent.
    pub fn stop(&self) {
        let previous = self.shared.state.swap(STATE_STOPPING, Ordering::AcqRel);
        if previous == STATE_CREATED {
            // The detection thread never ran.
            self.shared.state.store(STATE_STOPPED, Ordering::Release);
            return;
        }

        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("detection thread panicked");
            }
            println!("{}", self.latency_report());
            info!("detection engine stopped");
        }
        self.shared.state.store(STATE_STOPPED, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.state() == STATE_RUNNING
    }

    /// Completed detection passes.
    pub fn pass_count(&self) -> u64 {
        self.shared.pass_count.load(Ordering::Relaxed)
    }

    /// Opportunities emitted across all passes.
    pub fn opportunity_count(&self) -> u64 {
        self.shared.opportunity_count.load(Ordering::Relaxed)
    }

    /// Quotes dropped by the transport since construction.
    pub fn drop_count(&self) -> u64 {
        self.shared.transport.drop_count()
    }

    pub fn tracker(&self) -> &LatencyTracker {
        self.shared.transport.tracker()
    }

    pub fn latency_report(&self) -> String {
        self.shared.transport.latency_report()
    }

    fn state(&self) -> u8 {
        self.shared.state.load(Ordering::Acquire)
    }
}

impl Drop for ArbEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(shared: &Arc<EngineShared>, config: &EngineConfig) {
    let mut world = WorldView::new();
    let mut last_report = Instant::now();
    let mut report_count: u32 = 0;

    while shared.state.load(Ordering::Acquire) == STATE_RUNNING {
        let drained = shared.transport.drain_all(&mut world);
        let now = now_ms();
        let opportunities = detect_opportunities(&world, &config.detector, now);

        shared.pass_count.fetch_add(1, Ordering::Relaxed);
        shared
            .opportunity_count
            .fetch_add(opportunities.len() as u64, Ordering::Relaxed);
        if drained > 0 {
            trace!(
                drained,
                tracked = world.len(),
                opportunities = opportunities.len(),
                "detection pass"
            );
        }

        *shared.opportunities.lock() = Arc::new(opportunities);

        if last_report.elapsed() >= config.report_interval {
            report_count += 1;
            if config.max_reports > 0 {
                info!("latency report {report_count}/{}", config.max_reports);
            } else {
                info!("latency report {report_count}");
            }
            println!("{}", shared.transport.latency_report());
            last_report = Instant::now();

            if config.max_reports > 0 && report_count >= config.max_reports {
                info!(reports = report_count, "benchmark complete, shutting down");
                let hook = shared.shutdown_hook.lock().take();
                shared.state.store(STATE_STOPPED, Ordering::Release);
                if let Some(hook) = hook {
                    hook();
                }
                return;
            }
        }

        thread::sleep(config.interval);
    }

    shared.state.store(STATE_STOPPED, Ordering::Release);
}
