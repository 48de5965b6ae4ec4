//! Symbol interning and normalisation.
//!
//! Venues name the same asset differently (`BTCUSDT`, `BTC-USD`, `XBTUSD`).
//! Raw symbol strings are interned once at decode time so quotes carry a
//! `Copy` handle through the transport instead of a heap string; the
//! normalised form used for cross-venue grouping is cached per handle.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Interned handle for a venue-native symbol string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Intern a raw symbol string in the process-wide table.
    pub fn intern(raw: &str) -> Self {
        SymbolTable::global().intern(raw)
    }

    /// The interned string. Empty if the id was never interned.
    pub fn resolve(self) -> String {
        SymbolTable::global().resolve(self)
    }

    /// Handle for the normalised form of this symbol.
    pub fn normalized(self) -> Self {
        SymbolTable::global().normalized(self)
    }
}

/// Process-wide symbol registry.
pub struct SymbolTable {
    forward: DashMap<String, u32>,
    reverse: DashMap<u32, String>,
    /// Cached native id -> normalised id.
    normalized: DashMap<u32, u32>,
    next_id: AtomicU32,
}

impl SymbolTable {
    fn new() -> Self {
        Self {
            forward: DashMap::new(),
            reverse: DashMap::new(),
            normalized: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    pub fn global() -> &'static SymbolTable {
        static TABLE: OnceLock<SymbolTable> = OnceLock::new();
        TABLE.get_or_init(SymbolTable::new)
    }

    pub fn intern(&self, raw: &str) -> SymbolId {
        if let Some(id) = self.forward.get(raw) {
            return SymbolId(*id);
        }
        // Racing interns of the same string are arbitrated by the entry API.
        let id = *self.forward.entry(raw.to_string()).or_insert_with(|| {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.reverse.insert(id, raw.to_string());
            id
        });
        SymbolId(id)
    }

    pub fn resolve(&self, id: SymbolId) -> String {
        self.reverse
            .get(&id.0)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn normalized(&self, id: SymbolId) -> SymbolId {
        if let Some(norm) = self.normalized.get(&id.0) {
            return SymbolId(*norm);
        }
        let raw = self.resolve(id);
        let norm = self.intern(&normalize_symbol(&raw));
        self.normalized.insert(id.0, norm.0);
        norm
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}

/// Reduce a venue-native symbol to its base asset.
///
/// All covered venues quote against a USD-pegged currency, so the base asset
/// is the unit being arbitraged. Rules, applied in order: uppercase; truncate
/// at the first `-` (`BTC-USD` -> `BTC`); strip a trailing `USDT`
/// (`BTCUSDT` -> `BTC`); strip a trailing `USD` (`BTCUSD` -> `BTC`).
/// Suffixes are only stripped when something remains, so `USDT` itself is
/// left unchanged. Idempotent.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    if let Some(dash) = upper.find('-') {
        return upper[..dash].to_string();
    }
    if upper.len() > 4 && upper.ends_with("USDT") {
        return upper[..upper.len() - 4].to_string();
    }
    if upper.len() > 3 && upper.ends_with("USD") {
        return upper[..upper.len() - 3].to_string();
    }
    upper
}
