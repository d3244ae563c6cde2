//! Alert events produced by the change detector.

use compact_str::CompactString;

/// A qualifying upward price move, consumed immediately by the notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    /// Trading-pair symbol (e.g., "BTC-USDT").
    pub symbol: CompactString,
    /// Fractional change relative to the baseline (0.02 = 2%).
    pub change: f64,
    /// Owner of the base asset, when the coin is in the registry.
    pub owner: Option<String>,
}

impl AlertEvent {
    /// Change expressed as a percentage.
    pub fn change_pct(&self) -> f64 {
        self.change * 100.0
    }
}
