//! Price snapshots keyed by trading-pair symbol.

use compact_str::CompactString;
use std::collections::HashMap;

/// Last-traded prices for a set of trading pairs (e.g., "BTC-USDT"), produced
/// wholesale by one fetch and replaced entirely by the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    prices: HashMap<CompactString, f64>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pair: &str, price: f64) {
        self.prices.insert(CompactString::new(pair), price);
    }

    pub fn price(&self, pair: &str) -> Option<f64> {
        self.prices.get(pair).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompactString, f64)> {
        self.prices.iter().map(|(pair, price)| (pair, *price))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (pair, price) in iter {
            snapshot.insert(pair, price);
        }
        snapshot
    }
}

/// Base-asset code of a trading pair: "BTC-USDT" -> "BTC".
pub fn base_asset(pair: &str) -> &str {
    pair.split('-').next().unwrap_or(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snapshot_insert_and_lookup() {
        let snapshot: PriceSnapshot = [("BTC-USDT", 100.0), ("ETH-USDT", 50.0)]
            .into_iter()
            .collect();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.price("BTC-USDT"), Some(100.0));
        assert_eq!(snapshot.price("XRP-USDT"), None);
    }

    #[test]
    fn test_base_asset() {
        assert_eq!(base_asset("BTC-USDT"), "BTC");
        assert_eq!(base_asset("BTC"), "BTC");
    }
}
