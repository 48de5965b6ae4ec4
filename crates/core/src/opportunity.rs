//! Detected cross-venue price dislocations.

use crate::Venue;
use serde::{Deserialize, Serialize};

/// A pair of simultaneous prices that would permit risk-free profit in the
/// absence of fees, latency, and execution risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Normalised base asset (e.g. `BTC`).
    pub symbol: String,
    pub buy_venue: Venue,
    pub sell_venue: Venue,
    /// Ask price on the buy venue.
    pub buy_price: f64,
    /// Bid price on the sell venue. Always greater than `buy_price`.
    pub sell_price: f64,
    /// Profit in basis points: (sell - buy) / buy * 10000
    pub profit_bps: f64,
    /// min(buy-side ask size, sell-side bid size)
    pub max_qty: f64,
    pub detected_ms: u64,
}

impl Opportunity {
    pub fn profit_pct(&self) -> f64 {
        self.profit_bps / 100.0
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.detected_ms)
    }
}

/// Profit in basis points for buying at `buy` and selling at `sell`.
/// A non-positive buy price yields zero rather than dividing by it.
pub fn profit_bps(buy: f64, sell: f64) -> f64 {
    if buy > 0.0 {
        (sell - buy) / buy * 10_000.0
    } else {
        0.0
    }
}
