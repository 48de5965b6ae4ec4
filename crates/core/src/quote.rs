//! Top-of-book quotes and freshness classification.

use crate::{SymbolId, Venue};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Quotes younger than this are `Live`.
pub const LIVE_THRESHOLD_MS: u64 = 1_000;
/// Quotes younger than this (but not `Live`) are `Slow`; older are `Stale`.
pub const SLOW_THRESHOLD_MS: u64 = 5_000;

/// Best bid/offer for one symbol at one venue at one instant.
///
/// `Copy` by design: quotes move through the transport by value and the
/// numeric path performs no heap allocation (the symbol is an interned
/// handle, the venue an inline tag).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub venue: Venue,
    pub symbol: SymbolId,
    pub bid_price: f64,
    pub ask_price: f64,
    pub bid_qty: f64,
    pub ask_qty: f64,
    /// Wall-clock milliseconds since epoch at the moment of decode.
    pub recv_ms: u64,
}

/// Identity of a quote in the world view.
pub type QuoteKey = (Venue, SymbolId);

impl Quote {
    pub fn new(
        venue: Venue,
        symbol: &str,
        bid_price: f64,
        ask_price: f64,
        bid_qty: f64,
        ask_qty: f64,
        recv_ms: u64,
    ) -> Self {
        Self {
            venue,
            symbol: SymbolId::intern(symbol),
            bid_price,
            ask_price,
            bid_qty,
            ask_qty,
            recv_ms,
        }
    }

    #[inline]
    pub fn key(&self) -> QuoteKey {
        (self.venue, self.symbol)
    }

    /// Bid/ask spread in basis points of the bid.
    pub fn spread_bps(&self) -> f64 {
        if self.bid_price > 0.0 {
            (self.ask_price - self.bid_price) / self.bid_price * 10_000.0
        } else {
            0.0
        }
    }

    pub fn mid_price(&self) -> f64 {
        (self.bid_price + self.ask_price) / 2.0
    }

    #[inline]
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.recv_ms)
    }

    #[inline]
    pub fn freshness(&self, now_ms: u64) -> Freshness {
        Freshness::from_age_ms(self.age_ms(now_ms))
    }
}

/// Age classification of a quote relative to the current wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    /// Younger than one second.
    Live,
    /// One to five seconds old.
    Slow,
    /// Five seconds or older; excluded from detection.
    Stale,
}

impl Freshness {
    pub fn from_age_ms(age_ms: u64) -> Self {
        if age_ms < LIVE_THRESHOLD_MS {
            Freshness::Live
        } else if age_ms < SLOW_THRESHOLD_MS {
            Freshness::Slow
        } else {
            Freshness::Stale
        }
    }

    /// Live and Slow quotes participate in detection.
    #[inline]
    pub fn is_usable(self) -> bool {
        !matches!(self, Freshness::Stale)
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(bid: f64, ask: f64, recv_ms: u64) -> Quote {
        Quote::new(Venue::Binance, "BTCUSDT", bid, ask, 1.0, 1.0, recv_ms)
    }

    #[test]
    fn test_freshness_boundaries() {
        assert_eq!(Freshness::from_age_ms(0), Freshness::Live);
        assert_eq!(Freshness::from_age_ms(999), Freshness::Live);
        assert_eq!(Freshness::from_age_ms(1_000), Freshness::Slow);
        assert_eq!(Freshness::from_age_ms(4_999), Freshness::Slow);
        assert_eq!(Freshness::from_age_ms(5_000), Freshness::Stale);
        assert!(Freshness::Slow.is_usable());
        assert!(!Freshness::Stale.is_usable());
    }

    #[test]
    fn test_age_saturates_on_clock_skew() {
        // A quote stamped ahead of the observer's clock reads as age zero.
        let q = quote(100.0, 101.0, 2_000);
        assert_eq!(q.age_ms(1_500), 0);
        assert_eq!(q.freshness(1_500), Freshness::Live);
    }

    #[test]
    fn test_spread_and_mid() {
        let q = quote(100.0, 101.0, 0);
        assert!((q.spread_bps() - 100.0).abs() < 1e-9);
        assert!((q.mid_price() - 100.5).abs() < 1e-9);

        let degenerate = quote(0.0, 101.0, 0);
        assert_eq!(degenerate.spread_bps(), 0.0);
    }

    #[test]
    fn test_key_identity() {
        let a = quote(100.0, 101.0, 0);
        let b = quote(99.0, 100.0, 5);
        assert_eq!(a.key(), b.key());

        let other = Quote::new(Venue::Coinbase, "BTC-USD", 100.0, 101.0, 1.0, 1.0, 0);
        assert_ne!(a.key(), other.key());
    }
}
