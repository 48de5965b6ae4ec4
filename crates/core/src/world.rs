//! Latest-quote view maintained by the detection thread.

use crate::{Quote, QuoteKey};
use rustc_hash::FxHashMap;

/// Latest quote per (venue, symbol) key.
///
/// Single-owner: only the detection thread touches it after draining the
/// transport, so no synchronisation guards the map.
#[derive(Debug, Default)]
pub struct WorldView {
    quotes: FxHashMap<QuoteKey, Quote>,
}

impl WorldView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a quote, replacing any prior entry for its key.
    #[inline]
    pub fn apply(&mut self, quote: Quote) {
        self.quotes.insert(quote.key(), quote);
    }

    pub fn get(&self, key: &QuoteKey) -> Option<&Quote> {
        self.quotes.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.values()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Venue;

    #[test]
    fn test_apply_overwrites_per_key() {
        let mut world = WorldView::new();
        let first = Quote::new(Venue::Binance, "BTCUSDT", 100.0, 101.0, 1.0, 1.0, 10);
        let second = Quote::new(Venue::Binance, "BTCUSDT", 100.5, 101.5, 2.0, 2.0, 20);
        let other = Quote::new(Venue::Coinbase, "BTC-USD", 100.2, 101.2, 1.0, 1.0, 10);

        world.apply(first);
        world.apply(other);
        world.apply(second);

        assert_eq!(world.len(), 2);
        assert_eq!(world.get(&second.key()), Some(&second));
    }
}
