//! Cross-venue dislocation scan over the drained world view.

use quotearb_core::{profit_bps, Opportunity, Quote, SymbolId, WorldView};
use rustc_hash::FxHashMap;

/// Scan parameters. Fixed once the engine starts.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Opportunities below this profit (basis points) are discarded.
    pub min_profit_bps: f64,
    /// Maximum allowed difference between the ages of the two quotes
    /// forming an opportunity.
    pub max_age_skew_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_profit_bps: 5.0,
            max_age_skew_ms: 500,
        }
    }
}

/// One detection pass: group usable quotes by normalised symbol, evaluate
/// every unordered venue pair in both directions, and emit the candidates
/// that clear the age-skew and profit filters.
pub fn detect_opportunities(
    world: &WorldView,
    config: &DetectorConfig,
    now_ms: u64,
) -> Vec<Opportunity> {
    let mut by_symbol: FxHashMap<SymbolId, Vec<&Quote>> = FxHashMap::default();
    for quote in world.iter() {
        if quote.freshness(now_ms).is_usable() {
            by_symbol.entry(quote.symbol.normalized()).or_default().push(quote);
        }
    }

    let mut opportunities = Vec::new();
    for (symbol, quotes) in &by_symbol {
        if quotes.len() < 2 {
            continue;
        }
        let name = symbol.resolve();

        for i in 0..quotes.len() {
            for j in i + 1..quotes.len() {
                let (a, b) = (quotes[i], quotes[j]);

                let skew = a.age_ms(now_ms).abs_diff(b.age_ms(now_ms));
                if skew > config.max_age_skew_ms {
                    tracing::trace!(
                        symbol = %name,
                        a = %a.venue,
                        b = %b.venue,
                        skew_ms = skew,
                        "pair skipped: age skew"
                    );
                    continue;
                }

                // At most one direction can cross for a given pair.
                if let Some(opp) = cross(&name, a, b, config, now_ms) {
                    opportunities.push(opp);
                }
                if let Some(opp) = cross(&name, b, a, config, now_ms) {
                    opportunities.push(opp);
                }
            }
        }
    }
    opportunities
}

/// Evaluate buying at `buy`'s ask and selling at `sell`'s bid.
fn cross(
    symbol: &str,
    buy: &Quote,
    sell: &Quote,
    config: &DetectorConfig,
    now_ms: u64,
) -> Option<Opportunity> {
    if buy.ask_price <= 0.0 || sell.bid_price <= buy.ask_price {
        return None;
    }
    let bps = profit_bps(buy.ask_price, sell.bid_price);
    if bps < config.min_profit_bps {
        return None;
    }
    Some(Opportunity {
        symbol: symbol.to_string(),
        buy_venue: buy.venue,
        sell_venue: sell.venue,
        buy_price: buy.ask_price,
        sell_price: sell.bid_price,
        profit_bps: bps,
        max_qty: buy.ask_qty.min(sell.bid_qty),
        detected_ms: now_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotearb_core::Venue;

    const NOW: u64 = 1_700_000_000_000;

    fn world(quotes: &[Quote]) -> WorldView {
        let mut world = WorldView::new();
        for &quote in quotes {
            world.apply(quote);
        }
        world
    }

    /// Two venues quoting the same asset in their native formats: one
    /// opportunity, buy where the ask is low, sell where the bid is high.
    #[test]
    fn test_trivial_cross_venue_arb() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 100.00, 101.00, 2.0, 3.0, NOW),
            Quote::new(Venue::Coinbase, "BTC-USD", 102.50, 103.00, 1.5, 2.0, NOW),
        ]);
        let opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);

        assert_eq!(opps.len(), 1);
        let opp = &opps[0];
        assert_eq!(opp.symbol, "BTC");
        assert_eq!(opp.buy_venue, Venue::Binance);
        assert_eq!(opp.sell_venue, Venue::Coinbase);
        assert_eq!(opp.buy_price, 101.00);
        assert_eq!(opp.sell_price, 102.50);
        assert!((opp.profit_bps - 148.5148).abs() < 0.01);
        assert_eq!(opp.max_qty, 1.5);
        assert_eq!(opp.detected_ms, NOW);
    }

    #[test]
    fn test_age_skew_rejects_pair() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 100.00, 101.00, 2.0, 3.0, NOW),
            Quote::new(Venue::Coinbase, "BTC-USD", 102.50, 103.00, 1.5, 2.0, NOW - 800),
        ]);
        let opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);
        assert!(opps.is_empty());
    }

    #[test]
    fn test_age_skew_boundary_inclusive() {
        let quotes = [
            Quote::new(Venue::Binance, "BTCUSDT", 100.00, 101.00, 2.0, 3.0, NOW),
            Quote::new(Venue::Coinbase, "BTC-USD", 102.50, 103.00, 1.5, 2.0, NOW - 500),
        ];
        // Skew exactly at the limit: accepted.
        let opps = detect_opportunities(&world(&quotes), &DetectorConfig::default(), NOW);
        assert_eq!(opps.len(), 1);

        // One millisecond above: rejected.
        let quotes = [
            quotes[0],
            Quote::new(Venue::Coinbase, "BTC-USD", 102.50, 103.00, 1.5, 2.0, NOW - 501),
        ];
        let opps = detect_opportunities(&world(&quotes), &DetectorConfig::default(), NOW);
        assert!(opps.is_empty());
    }

    #[test]
    fn test_profit_threshold_boundary() {
        // 1024.0 -> 1024.5 is exactly 4.8828125 bps (dyadic, so the f64
        // arithmetic is exact and the equality case is meaningful).
        let quotes = [
            Quote::new(Venue::Binance, "ETHUSDT", 1023.5, 1024.0, 1.0, 1.0, NOW),
            Quote::new(Venue::Kraken, "ETH-USD", 1024.5, 1025.0, 1.0, 1.0, NOW),
        ];

        // Profit exactly equal to the threshold: emitted.
        let config = DetectorConfig {
            min_profit_bps: 4.8828125,
            ..DetectorConfig::default()
        };
        let opps = detect_opportunities(&world(&quotes), &config, NOW);
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].profit_bps, 4.8828125);

        // A hair above the profit: nothing emitted.
        let config = DetectorConfig {
            min_profit_bps: 4.8829,
            ..DetectorConfig::default()
        };
        let opps = detect_opportunities(&world(&quotes), &config, NOW);
        assert!(opps.is_empty());
    }

    /// Three venues; the two crossings that clear the filter both emit,
    /// and no wrong-way pair does.
    #[test]
    fn test_three_venues_both_crossings_emit() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 100.0, 101.0, 1.0, 1.0, NOW),
            Quote::new(Venue::Coinbase, "BTC-USD", 100.2, 100.5, 1.0, 1.0, NOW),
            Quote::new(Venue::Kraken, "BTCUSD", 101.8, 102.0, 1.0, 1.0, NOW),
        ]);
        let mut opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);
        opps.sort_by(|a, b| b.profit_bps.partial_cmp(&a.profit_bps).unwrap());

        assert_eq!(opps.len(), 2);
        // Coinbase -> Kraken: buy 100.5, sell 101.8 (~129 bps).
        assert_eq!(opps[0].buy_venue, Venue::Coinbase);
        assert_eq!(opps[0].sell_venue, Venue::Kraken);
        assert!((opps[0].profit_bps - 129.35).abs() < 0.01);
        // Binance -> Kraken: buy 101.0, sell 101.8 (~79 bps).
        assert_eq!(opps[1].buy_venue, Venue::Binance);
        assert_eq!(opps[1].sell_venue, Venue::Kraken);
        assert!((opps[1].profit_bps - 79.21).abs() < 0.01);
    }

    #[test]
    fn test_stale_quotes_excluded() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 100.00, 101.00, 2.0, 3.0, NOW - 5_000),
            Quote::new(Venue::Coinbase, "BTC-USD", 102.50, 103.00, 1.5, 2.0, NOW - 4_999),
        ]);
        // The stale leg drops out, leaving fewer than two quotes.
        let opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);
        assert!(opps.is_empty());
    }

    #[test]
    fn test_slow_quotes_participate() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 100.00, 101.00, 2.0, 3.0, NOW - 4_800),
            Quote::new(Venue::Coinbase, "BTC-USD", 102.50, 103.00, 1.5, 2.0, NOW - 4_999),
        ]);
        let opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);
        assert_eq!(opps.len(), 1);
    }

    #[test]
    fn test_zero_buy_price_guarded() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 0.0, 0.0, 2.0, 3.0, NOW),
            Quote::new(Venue::Coinbase, "BTC-USD", 102.50, 103.00, 1.5, 2.0, NOW),
        ]);
        let opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);
        assert!(opps.is_empty());
    }

    #[test]
    fn test_uncrossed_books_emit_nothing() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 100.0, 100.1, 1.0, 1.0, NOW),
            Quote::new(Venue::Coinbase, "BTC-USD", 100.0, 100.1, 1.0, 1.0, NOW),
        ]);
        let opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);
        assert!(opps.is_empty());
    }

    #[test]
    fn test_different_assets_never_pair() {
        let world = world(&[
            Quote::new(Venue::Binance, "BTCUSDT", 100.0, 101.0, 1.0, 1.0, NOW),
            Quote::new(Venue::Coinbase, "ETH-USD", 102.5, 103.0, 1.0, 1.0, NOW),
        ]);
        let opps = detect_opportunities(&world, &DetectorConfig::default(), NOW);
        assert!(opps.is_empty());
    }
}
