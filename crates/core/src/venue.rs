//! Venue identifiers.

use serde::{Deserialize, Serialize};

/// Venue identifier — a small inline tag carried by every quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Venue {
    Binance = 0,
    Coinbase = 1,
    Kraken = 2,
    Bybit = 3,
    Okx = 4,
    GateIO = 5,
    Upbit = 6,
    Bithumb = 7,
}

impl Venue {
    /// Number of known venues. The latency tracker sizes its table off this.
    pub const COUNT: usize = 8;

    /// All known venues.
    pub const ALL: [Venue; Venue::COUNT] = [
        Venue::Binance,
        Venue::Coinbase,
        Venue::Kraken,
        Venue::Bybit,
        Venue::Okx,
        Venue::GateIO,
        Venue::Upbit,
        Venue::Bithumb,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Venue::Binance),
            1 => Some(Venue::Coinbase),
            2 => Some(Venue::Kraken),
            3 => Some(Venue::Bybit),
            4 => Some(Venue::Okx),
            5 => Some(Venue::GateIO),
            6 => Some(Venue::Upbit),
            7 => Some(Venue::Bithumb),
            _ => None,
        }
    }

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Binance => "Binance",
            Venue::Coinbase => "Coinbase",
            Venue::Kraken => "Kraken",
            Venue::Bybit => "Bybit",
            Venue::Okx => "OKX",
            Venue::GateIO => "GateIO",
            Venue::Upbit => "Upbit",
            Venue::Bithumb => "Bithumb",
        }
    }

    /// Parse a venue name, case-insensitively.
    pub fn from_str(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "binance" => Some(Venue::Binance),
            "coinbase" => Some(Venue::Coinbase),
            "kraken" => Some(Venue::Kraken),
            "bybit" => Some(Venue::Bybit),
            "okx" => Some(Venue::Okx),
            "gateio" => Some(Venue::GateIO),
            "upbit" => Some(Venue::Upbit),
            "bithumb" => Some(Venue::Bithumb),
            _ => None,
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_roundtrip() {
        for venue in Venue::ALL {
            assert_eq!(Venue::from_id(venue.id()), Some(venue));
            assert_eq!(Venue::from_str(venue.as_str()), Some(venue));
        }
        assert_eq!(Venue::from_id(200), None);
    }

    #[test]
    fn test_venue_from_str_case_insensitive() {
        assert_eq!(Venue::from_str("BINANCE"), Some(Venue::Binance));
        assert_eq!(Venue::from_str("coinbase"), Some(Venue::Coinbase));
        assert_eq!(Venue::from_str("ftx"), None);
    }
}
