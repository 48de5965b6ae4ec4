//! Headless cross-venue arbitrage scanner.
//!
//! Wires simulated venue producers into the detection engine, renders
//! opportunity snapshots, and prints periodic queue-latency reports.

mod render;
mod sim;

use clap::Parser;
use quotearb_core::Venue;
use quotearb_engine::ArbEngine;
use quotearb_transport::SharedQuoteTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Cross-venue quote arbitrage scanner
#[derive(Parser, Debug)]
#[command(name = "quotearb-server")]
#[command(about = "Cross-venue quote arbitrage scanner", long_about = None)]
struct Args {
    /// Auto-shutdown after N latency reports (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_reports: u32,

    /// Minimum profit in basis points
    #[arg(short = 'p', long, default_value_t = 5.0)]
    min_profit_bps: f64,

    /// Detection pass interval in milliseconds
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Latency report cadence in seconds
    #[arg(long, default_value_t = 10)]
    report_interval_secs: u64,

    /// Maximum age skew between paired quotes in milliseconds
    #[arg(long, default_value_t = 500)]
    max_age_skew_ms: u64,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Comma-separated venues to simulate
    #[arg(long, default_value = "binance,coinbase,kraken,bybit")]
    venues: String,

    /// Quotes per second per simulated venue
    #[arg(long, default_value_t = 200)]
    rate: u32,

    /// Emit opportunities as JSON lines instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn parse_venues(list: &str) -> Vec<Venue> {
    let mut venues = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match Venue::from_str(name) {
            Some(venue) if !venues.contains(&venue) => venues.push(venue),
            Some(_) => {}
            None => warn!("unknown venue '{name}' ignored"),
        }
    }
    venues
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("cross-venue arbitrage scanner");
    info!(queue = SharedQuoteTransport::QUEUE_LABEL, "transport variant");
    if args.max_reports > 0 {
        info!(
            max_reports = args.max_reports,
            "benchmark mode: auto-shutdown after ~{}s",
            args.max_reports as u64 * args.report_interval_secs
        );
    }

    let venues = parse_venues(&args.venues);
    if venues.is_empty() {
        eprintln!("no valid venues configured");
        std::process::exit(1);
    }

    let engine = match ArbEngine::new() {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("failed to construct engine resources: {e}");
            std::process::exit(1);
        }
    };
    engine.set_min_profit_bps(args.min_profit_bps);
    engine.set_max_age_skew_ms(args.max_age_skew_ms);
    engine.set_interval(Duration::from_millis(args.interval_ms));
    engine.set_report_interval(Duration::from_secs(args.report_interval_secs));
    engine.set_max_reports(args.max_reports);

    // Benchmark completion is signalled from the detection thread.
    let (done_tx, mut done_rx) = tokio::sync::mpsc::channel::<()>(1);
    engine.set_shutdown_hook(move || {
        let _ = done_tx.try_send(());
    });

    if let Err(e) = engine.start() {
        eprintln!("failed to start engine: {e}");
        std::process::exit(1);
    }

    let producers_running = Arc::new(AtomicBool::new(true));
    let producer_handles = sim::spawn_producers(
        Arc::clone(&engine),
        &venues,
        args.rate,
        Arc::clone(&producers_running),
    );
    info!(
        venues = venues.len(),
        rate = args.rate,
        "simulated producers running"
    );

    let renderer = tokio::spawn(render::run(Arc::clone(&engine), args.json));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = done_rx.recv() => {
            info!("benchmark complete");
        }
    }

    renderer.abort();
    producers_running.store(false, Ordering::Relaxed);
    for handle in producer_handles {
        let _ = handle.join();
    }
    engine.stop();

    info!(
        passes = engine.pass_count(),
        opportunities = engine.opportunity_count(),
        drops = engine.drop_count(),
        "scanner stopped cleanly"
    );
}
