//! Baseline-vs-current change detector.
//!
//! Compares the current snapshot against the baseline taken one cycle
//! earlier, applies the threshold and the owner filter, and produces alert
//! events.

use coinwatch_core::{base_asset, AlertEvent, CoinBook, PriceSnapshot, WatchSettings};
use tracing::debug;

/// Detector holding the baseline snapshot the next comparison runs against.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    baseline: PriceSnapshot,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_baseline(baseline: PriceSnapshot) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> &PriceSnapshot {
        &self.baseline
    }

    /// Replace the baseline with a just-fetched snapshot, so the baseline
    /// always trails the current prices by exactly one cycle.
    pub fn set_baseline(&mut self, snapshot: PriceSnapshot) {
        self.baseline = snapshot;
    }

    /// Produce one alert per symbol whose upward move meets the threshold
    /// and passes the owner filter. Downward moves never alert. Symbols
    /// missing from `current` are skipped silently, as are baseline prices
    /// that are zero or non-finite (bad exchange data, not a crash).
    pub fn detect(
        &self,
        current: &PriceSnapshot,
        coins: &CoinBook,
        settings: &WatchSettings,
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for (pair, baseline_price) in self.baseline.iter() {
            let Some(current_price) = current.price(pair) else {
                continue;
            };
            if !baseline_price.is_finite() || baseline_price <= 0.0 {
                debug!(%pair, baseline_price, "skipping pair with unusable baseline price");
                continue;
            }

            let change = (current_price - baseline_price) / baseline_price;
            if change < settings.threshold {
                continue;
            }

            let owner = coins.owner_of(base_asset(pair));
            if !settings.follows(owner) {
                continue;
            }

            events.push(AlertEvent {
                symbol: pair.clone(),
                change,
                owner: owner.map(str::to_string),
            });
        }

        events.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwatch_core::CoinEntry;
    use pretty_assertions::assert_eq;

    fn settings_with_threshold(threshold: f64) -> WatchSettings {
        WatchSettings {
            threshold,
            ..Default::default()
        }
    }

    #[test]
    fn test_qualifying_move_emits_one_alert() {
        let coins = CoinBook::from_entries(vec![CoinEntry::new("BTC", "alice")]);
        let detector =
            ChangeDetector::with_baseline([("BTC-USDT", 100.0)].into_iter().collect());
        let current: PriceSnapshot = [("BTC-USDT", 102.0)].into_iter().collect();

        let events = detector.detect(&current, &coins, &settings_with_threshold(0.0198));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol, "BTC-USDT");
        assert!((events[0].change - 0.02).abs() < 1e-9);
        assert_eq!(events[0].owner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_move_below_threshold_is_silent() {
        let coins = CoinBook::new();
        let detector =
            ChangeDetector::with_baseline([("BTC-USDT", 100.0)].into_iter().collect());
        let current: PriceSnapshot = [("BTC-USDT", 101.0)].into_iter().collect();

        let events = detector.detect(&current, &coins, &settings_with_threshold(0.0198));
        assert!(events.is_empty());
    }

    #[test]
    fn test_downward_move_never_alerts() {
        let coins = CoinBook::new();
        let detector =
            ChangeDetector::with_baseline([("BTC-USDT", 100.0)].into_iter().collect());
        let current: PriceSnapshot = [("BTC-USDT", 80.0)].into_iter().collect();

        let events = detector.detect(&current, &coins, &settings_with_threshold(0.0198));
        assert!(events.is_empty());
    }

    #[test]
    fn test_symbol_missing_from_current_is_skipped() {
        let coins = CoinBook::new();
        let detector = ChangeDetector::with_baseline(
            [("BTC-USDT", 100.0), ("ETH-USDT", 10.0)].into_iter().collect(),
        );
        let current: PriceSnapshot = [("ETH-USDT", 11.0)].into_iter().collect();

        let events = detector.detect(&current, &coins, &settings_with_threshold(0.05));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol, "ETH-USDT");
    }

    #[test]
    fn test_zero_baseline_price_is_skipped() {
        let coins = CoinBook::new();
        let detector =
            ChangeDetector::with_baseline([("BAD-USDT", 0.0)].into_iter().collect());
        let current: PriceSnapshot = [("BAD-USDT", 5.0)].into_iter().collect();

        let events = detector.detect(&current, &coins, &settings_with_threshold(0.0198));
        assert!(events.is_empty());
    }

    #[test]
    fn test_owner_filter_excludes_non_members_and_unowned() {
        let coins = CoinBook::from_entries(vec![
            CoinEntry::new("BTC", "alice"),
            CoinEntry::new("ETH", "bob"),
        ]);
        let detector = ChangeDetector::with_baseline(
            [("BTC-USDT", 100.0), ("ETH-USDT", 100.0), ("SOL-USDT", 100.0)]
                .into_iter()
                .collect(),
        );
        let current: PriceSnapshot =
            [("BTC-USDT", 110.0), ("ETH-USDT", 110.0), ("SOL-USDT", 110.0)]
                .into_iter()
                .collect();

        let mut settings = settings_with_threshold(0.05);
        settings.followed_owners.insert("alice".to_string());

        let events = detector.detect(&current, &coins, &settings);
        // bob's ETH and the unowned SOL are filtered out.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol, "BTC-USDT");
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let coins = CoinBook::from_entries(vec![CoinEntry::new("BTC", "alice")]);
        let detector = ChangeDetector::with_baseline(
            [("BTC-USDT", 100.0), ("SOL-USDT", 100.0)].into_iter().collect(),
        );
        let current: PriceSnapshot =
            [("BTC-USDT", 110.0), ("SOL-USDT", 110.0)].into_iter().collect();

        let events = detector.detect(&current, &coins, &settings_with_threshold(0.05));
        let symbols: Vec<_> = events.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC-USDT", "SOL-USDT"]);
        assert_eq!(events[1].owner, None);
    }

    #[test]
    fn test_empty_current_snapshot_yields_no_alerts() {
        let coins = CoinBook::new();
        let detector =
            ChangeDetector::with_baseline([("BTC-USDT", 100.0)].into_iter().collect());

        let events =
            detector.detect(&PriceSnapshot::new(), &coins, &settings_with_threshold(0.0));
        assert!(events.is_empty());
    }
}
