//! Outbound notification gate and alert formatting.

use crate::telegram::TelegramBot;
use coinwatch_core::{base_asset, AlertEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::{debug, error};
use url::Url;

/// Single choke point for every outbound message. When the user has muted
/// the bot via /stop, sends are dropped here; send failures are logged and
/// never propagate into the control loop.
pub struct Notifier {
    bot: Arc<TelegramBot>,
    enabled: AtomicBool,
}

impl Notifier {
    pub fn new(bot: Arc<TelegramBot>) -> Self {
        Self {
            bot,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub async fn send(&self, text: &str) {
        self.deliver(text, None).await;
    }

    pub async fn send_with_keyboard(&self, text: &str, keyboard: InlineKeyboardMarkup) {
        self.deliver(text, Some(keyboard)).await;
    }

    /// Format and send a price-surge alert.
    pub async fn alert(&self, event: &AlertEvent) {
        let (text, keyboard) = format_alert(event);
        self.deliver(&text, Some(keyboard)).await;
    }

    async fn deliver(&self, text: &str, keyboard: Option<InlineKeyboardMarkup>) {
        if !self.is_enabled() {
            debug!("messaging disabled, dropping outbound message");
            return;
        }
        if let Err(e) = self.bot.send(text, keyboard).await {
            error!(error = %e, "failed to send Telegram message");
        }
    }
}

/// Alert message plus a link button to the coin's exchange page.
pub fn format_alert(event: &AlertEvent) -> (String, InlineKeyboardMarkup) {
    let mut text = format!("{} is up {:.2}%", event.symbol, event.change_pct());
    if let Some(owner) = &event.owner {
        text.push_str(&format!(" owned by {owner} ✅"));
    }
    let stamp = chrono::Utc::now();
    text.push_str(&format!("\n⏰ {}", stamp.format("%Y-%m-%d %H:%M:%S UTC")));

    let base = base_asset(&event.symbol);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    if let Ok(link) = Url::parse(&format!("https://www.kucoin.com/price/{base}")) {
        rows.push(vec![InlineKeyboardButton::url("KuCoin", link)]);
    }

    (text, InlineKeyboardMarkup::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_str::CompactString;

    fn event(symbol: &str, change: f64, owner: Option<&str>) -> AlertEvent {
        AlertEvent {
            symbol: CompactString::new(symbol),
            change,
            owner: owner.map(str::to_string),
        }
    }

    #[test]
    fn test_alert_text_for_owned_coin() {
        let (text, _) = format_alert(&event("BTC-USDT", 0.02, Some("alice")));
        assert!(text.starts_with("BTC-USDT is up 2.00% owned by alice ✅"));
    }

    #[test]
    fn test_alert_text_for_unowned_coin() {
        let (text, _) = format_alert(&event("SOL-USDT", 0.034, None));
        assert!(text.starts_with("SOL-USDT is up 3.40%"));
        assert!(!text.contains("owned by"));
    }

    #[tokio::test]
    async fn test_disabled_notifier_drops_sends_without_network() {
        let bot = Arc::new(TelegramBot::new("123:test-token", 1).unwrap());
        let notifier = Notifier::new(bot);
        notifier.set_enabled(false);
        // Returns immediately; nothing reaches the transport.
        notifier.send("dropped").await;
        assert!(!notifier.is_enabled());
    }
}
