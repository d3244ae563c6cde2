//! Runtime configuration mutated by chat commands.

use std::collections::HashSet;

/// Default alert threshold (1.98%).
pub const DEFAULT_THRESHOLD: f64 = 0.0198;

/// Single-writer configuration state owned by the control loop: the command
/// processor mutates it, the scan path of the same cycle reads it.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Whether price scanning runs each cycle.
    pub scan_enabled: bool,
    /// Set by /start; the next cycle refetches the baseline instead of scanning.
    pub reset_baseline: bool,
    /// Fractional alert threshold (0.0198 = 1.98%).
    pub threshold: f64,
    /// Owner filter; empty means no filter.
    pub followed_owners: HashSet<String>,
    /// Watermark into the inbound Telegram update stream.
    pub last_update_id: Option<i32>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            scan_enabled: true,
            reset_baseline: false,
            threshold: DEFAULT_THRESHOLD,
            followed_owners: HashSet::new(),
            last_update_id: None,
        }
    }
}

impl WatchSettings {
    /// Owner-filter check: an empty filter passes everything; a non-empty
    /// filter passes only member owners, so unowned symbols are excluded.
    pub fn follows(&self, owner: Option<&str>) -> bool {
        if self.followed_owners.is_empty() {
            return true;
        }
        owner.is_some_and(|o| self.followed_owners.contains(o))
    }

    /// Followed owners rendered for display, or `empty_sentinel` when the
    /// filter is off.
    pub fn followed_list(&self, empty_sentinel: &str) -> String {
        if self.followed_owners.is_empty() {
            return empty_sentinel.to_string();
        }
        let mut owners: Vec<_> = self.followed_owners.iter().cloned().collect();
        owners.sort();
        owners.join(", ")
    }
}
