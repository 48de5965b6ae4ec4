//! Simulated venue producers.
//!
//! Stand-ins for the out-of-scope streaming clients: each venue gets one OS
//! thread emitting jittered quotes in that venue's native symbol format at
//! a fixed rate. Per-venue price bias keeps genuine cross-venue
//! dislocations appearing so the whole path stays exercised.

use quotearb_core::{now_ms, Quote, SymbolId, Venue};
use quotearb_engine::ArbEngine;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const BASES: [&str; 4] = ["BTC", "ETH", "SOL", "XRP"];
const START_MIDS: [f64; 4] = [68_000.0, 3_500.0, 150.0, 0.52];

/// A venue's native symbol for a base asset.
fn native_symbol(venue: Venue, base: &str) -> String {
    match venue {
        Venue::Coinbase | Venue::Kraken | Venue::Okx => format!("{base}-USD"),
        _ => format!("{base}USDT"),
    }
}

/// Spawn one producer thread per venue. Threads run until `running` goes
/// false.
pub fn spawn_producers(
    engine: Arc<ArbEngine>,
    venues: &[Venue],
    quotes_per_sec: u32,
    running: Arc<AtomicBool>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    for &venue in venues {
        let engine = Arc::clone(&engine);
        let running = Arc::clone(&running);
        let spawned = thread::Builder::new()
            .name(format!("feed-{}", venue.as_str().to_lowercase()))
            .spawn(move || run_producer(&engine, venue, quotes_per_sec, &running));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => warn!(venue = %venue, "failed to spawn producer: {e}"),
        }
    }
    handles
}

fn run_producer(engine: &ArbEngine, venue: Venue, quotes_per_sec: u32, running: &AtomicBool) {
    let mut rng = rand::thread_rng();
    let pause = Duration::from_micros(1_000_000 / u64::from(quotes_per_sec.max(1)));
    let symbols: Vec<SymbolId> = BASES
        .iter()
        .map(|base| SymbolId::intern(&native_symbol(venue, base)))
        .collect();
    let mut mids = START_MIDS;

    debug!(venue = %venue, rate = quotes_per_sec, "producer started");
    let mut tick: usize = 0;
    while running.load(Ordering::Relaxed) {
        let idx = tick % BASES.len();

        // Random walk on the shared mid, plus a per-venue bias so venues
        // disagree by a few basis points.
        mids[idx] *= 1.0 + rng.gen_range(-0.0005..0.0005);
        let bias = f64::from(venue.id()) * 0.0002 + rng.gen_range(-0.0008..0.0008);
        let mid = mids[idx] * (1.0 + bias);
        let half_spread = mid * 0.0001;

        let quote = Quote {
            venue,
            symbol: symbols[idx],
            bid_price: mid - half_spread,
            ask_price: mid + half_spread,
            bid_qty: rng.gen_range(0.1..5.0),
            ask_qty: rng.gen_range(0.1..5.0),
            recv_ms: now_ms(),
        };
        // Drops are counted by the transport; producers never retry.
        let _ = engine.push_quote(quote);

        tick += 1;
        thread::sleep(pause);
    }
    debug!(venue = %venue, "producer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_symbols_normalise_to_base() {
        for venue in Venue::ALL {
            for base in BASES {
                let native = native_symbol(venue, base);
                assert_eq!(quotearb_core::normalize_symbol(&native), base);
            }
        }
    }

    #[test]
    fn test_producers_feed_the_engine() {
        let engine = Arc::new(ArbEngine::new().unwrap());
        let running = Arc::new(AtomicBool::new(true));
        let handles = spawn_producers(
            Arc::clone(&engine),
            &[Venue::Binance, Venue::Coinbase],
            500,
            Arc::clone(&running),
        );

        // The first push pays the one-off timebase calibration sleep.
        thread::sleep(Duration::from_millis(400));
        running.store(false, Ordering::Relaxed);
        for handle in handles {
            handle.join().unwrap();
        }

        let tracked = engine.tracker().snapshot(Venue::Binance);
        assert!(tracked.is_some_and(|snap| snap.count > 0));
    }
}
