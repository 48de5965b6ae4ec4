//! Periodic opportunity renderer.
//!
//! A passive reader: pulls the engine's current snapshot on a fixed
//! cadence and prints the top opportunities sorted by profit, as a table
//! or as JSON lines.

use quotearb_core::Opportunity;
use quotearb_engine::ArbEngine;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const RENDER_INTERVAL: Duration = Duration::from_millis(500);
const TOP_N: usize = 10;

pub async fn run(engine: Arc<ArbEngine>, json: bool) {
    let mut ticker = tokio::time::interval(RENDER_INTERVAL);
    loop {
        ticker.tick().await;

        let snapshot = engine.opportunities();
        if snapshot.is_empty() {
            continue;
        }
        let mut opportunities: Vec<Opportunity> = snapshot.as_ref().clone();
        opportunities.sort_by(|a, b| {
            b.profit_bps
                .partial_cmp(&a.profit_bps)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        opportunities.truncate(TOP_N);

        if json {
            for opportunity in &opportunities {
                match serde_json::to_string(opportunity) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("failed to serialise opportunity: {e}"),
                }
            }
        } else {
            print_table(&opportunities);
        }
    }
}

fn print_table(opportunities: &[Opportunity]) {
    println!(
        "{:<8} {:<10} {:<10} {:>12} {:>12} {:>9} {:>10}",
        "Symbol", "Buy", "Sell", "Buy Px", "Sell Px", "Bps", "Max Qty"
    );
    for opp in opportunities {
        println!(
            "{:<8} {:<10} {:<10} {:>12.4} {:>12.4} {:>9.2} {:>10.4}",
            opp.symbol,
            opp.buy_venue.as_str(),
            opp.sell_venue.as_str(),
            opp.buy_price,
            opp.sell_price,
            opp.profit_bps,
            opp.max_qty,
        );
    }
}
