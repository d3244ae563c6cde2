//! Inbound chat command and callback processing.
//!
//! Long-polls the update stream behind a monotonic watermark, parses text
//! commands and inline-keyboard callbacks, and mutates the shared watch
//! settings and coin registry. Every handled event replies with exactly one
//! outbound notification; delivery is still subject to the notifier gate.

use crate::notifier::Notifier;
use crate::registry::{CoinRegistry, RegistryError};
use crate::telegram::TelegramBot;
use coinwatch_core::WatchSettings;
use std::collections::HashSet;
use std::sync::Arc;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, UpdateKind};
use teloxide::utils::command::{BotCommands, ParseError};
use tracing::{debug, warn};

/// Named threshold presets offered by /set_threshold.
const THRESHOLD_PRESETS: [(&str, f64); 3] = [
    ("Small Move 1%", 0.01),
    ("Standard 1.98%", 0.0198),
    ("Big Move 3.4%", 0.034),
];

/// The processed-callback set is cleared wholesale past this bound: an
/// approximate de-duplication window, not an exact one.
const PROCESSED_CALLBACK_CAP: usize = 5000;

/// Long-poll wait for inbound updates.
const POLL_TIMEOUT_SECS: u32 = 25;

/// Chat commands. Incoming text is lowercased before parsing, so matching
/// is case-insensitive.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "start receiving messages and rescan from a fresh baseline")]
    Start,
    #[command(description = "stop receiving messages and pause scanning")]
    Stop,
    #[command(description = "list watched coins")]
    ViewCoins,
    #[command(description = "add a coin: /add_coin SYMBOL OWNER", parse_with = "split")]
    AddCoin { symbol: String, owner: String },
    #[command(description = "remove a coin: /delete_coin SYMBOL")]
    DeleteCoin { symbol: String },
    #[command(description = "choose an alert threshold")]
    SetThreshold,
    #[command(description = "select owners to follow")]
    FollowOwners,
    #[command(description = "show current threshold and owner filter")]
    ViewSettings,
}

/// The command surface, rendered for the startup banner.
pub fn command_overview() -> String {
    Command::descriptions().to_string()
}

/// Consumes inbound updates and applies them to the shared state.
pub struct CommandProcessor {
    bot: Arc<TelegramBot>,
    notifier: Arc<Notifier>,
    processed_callbacks: HashSet<String>,
}

impl CommandProcessor {
    pub fn new(bot: Arc<TelegramBot>, notifier: Arc<Notifier>) -> Self {
        Self {
            bot,
            notifier,
            processed_callbacks: HashSet::new(),
        }
    }

    /// Fetch and handle all updates past the watermark. A failed fetch is
    /// logged and skipped; registry persistence failures propagate so the
    /// supervisor can restart the loop.
    pub async fn process_pending(
        &mut self,
        settings: &mut WatchSettings,
        registry: &mut CoinRegistry,
    ) -> Result<(), RegistryError> {
        let updates = match self.bot.updates(settings.last_update_id, POLL_TIMEOUT_SECS).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "failed to fetch Telegram updates");
                return Ok(());
            }
        };

        for update in updates {
            match &update.kind {
                UpdateKind::Message(message) => {
                    if let Some(text) = message.text() {
                        self.handle_text(&text.to_lowercase(), settings, registry)
                            .await?;
                    }
                }
                UpdateKind::CallbackQuery(query) => {
                    if let Some(data) = query.data.clone() {
                        self.apply_callback(&query.id, &data, settings).await;
                    }
                }
                _ => {}
            }
            settings.last_update_id = Some(update.id.0 as i32);
        }
        Ok(())
    }

    async fn handle_text(
        &mut self,
        text: &str,
        settings: &mut WatchSettings,
        registry: &mut CoinRegistry,
    ) -> Result<(), RegistryError> {
        let command = match Command::parse(text, "coinwatch") {
            Ok(command) => command,
            Err(ParseError::TooFewArguments { .. }) | Err(ParseError::TooManyArguments { .. }) => {
                self.notifier
                    .send("Invalid command format. Use '/add_coin SYMBOL OWNER'.")
                    .await;
                return Ok(());
            }
            Err(_) => {
                // Plain chatter and unknown commands are ignored.
                debug!(text, "ignoring non-command message");
                return Ok(());
            }
        };

        match command {
            Command::Stop => {
                // Confirm first: after the gate closes nothing goes out.
                self.notifier.send("You will no longer receive messages.").await;
                self.notifier.set_enabled(false);
                settings.scan_enabled = false;
            }

            Command::Start => {
                self.notifier.set_enabled(true);
                settings.scan_enabled = true;
                settings.reset_baseline = true;
                self.notifier.send("You will now receive messages again.").await;
            }

            Command::FollowOwners => {
                let owners = registry.owners();
                if owners.is_empty() {
                    self.notifier
                        .send("No owners known yet. Add coins with /add_coin SYMBOL OWNER first.")
                        .await;
                } else {
                    let mut rows: Vec<Vec<InlineKeyboardButton>> = owners
                        .iter()
                        .map(|owner| {
                            vec![InlineKeyboardButton::callback(
                                owner.clone(),
                                format!("follow_{owner}"),
                            )]
                        })
                        .collect();
                    rows.push(vec![InlineKeyboardButton::callback("No Filter", "follow_all")]);
                    self.notifier
                        .send_with_keyboard("Select owners to follow:", InlineKeyboardMarkup::new(rows))
                        .await;
                }
            }

            Command::AddCoin { symbol, owner } => {
                let symbol = symbol.to_uppercase();
                match registry.add(&symbol, &owner) {
                    Ok(()) => {
                        self.notifier
                            .send(&format!("Coin {symbol} added with owner {owner}."))
                            .await;
                    }
                    Err(RegistryError::Duplicate(_)) => {
                        self.notifier
                            .send(&format!("Coin {symbol} is already in the list."))
                            .await;
                    }
                    Err(e) => return Err(e),
                }
            }

            Command::DeleteCoin { symbol } => {
                let symbol = symbol.trim().to_uppercase();
                if symbol.is_empty() {
                    self.notifier
                        .send("Invalid command format. Use '/delete_coin SYMBOL'.")
                        .await;
                    return Ok(());
                }
                match registry.remove(&symbol) {
                    Ok(_) => self.notifier.send(&format!("Coin {symbol} deleted.")).await,
                    Err(RegistryError::NotFound(_)) => {
                        self.notifier.send(&format!("Coin {symbol} not found.")).await;
                    }
                    Err(e) => return Err(e),
                }
            }

            Command::ViewCoins => {
                if registry.book().is_empty() {
                    self.notifier.send("The coins list is currently empty.").await;
                } else {
                    let listing = registry
                        .book()
                        .entries()
                        .iter()
                        .map(|entry| format!("({} / {})", entry.symbol, entry.owner))
                        .collect::<Vec<_>>()
                        .join("\n");
                    self.notifier
                        .send(&format!("Current coins list:\n{listing}"))
                        .await;
                }
            }

            Command::SetThreshold => {
                let row: Vec<InlineKeyboardButton> = THRESHOLD_PRESETS
                    .iter()
                    .map(|(label, value)| {
                        InlineKeyboardButton::callback(label.to_string(), format!("threshold_{value}"))
                    })
                    .collect();
                self.notifier
                    .send_with_keyboard("Choose a new threshold:", InlineKeyboardMarkup::new(vec![row]))
                    .await;
            }

            Command::ViewSettings => {
                self.notifier.send(&settings_summary(settings)).await;
            }
        }
        Ok(())
    }

    /// Apply an inline-keyboard selection. Callback ids already seen are
    /// ignored so a redelivered event has no second effect.
    async fn apply_callback(&mut self, id: &str, data: &str, settings: &mut WatchSettings) {
        if !self.processed_callbacks.insert(id.to_string()) {
            debug!(callback_id = id, "duplicate callback ignored");
            return;
        }

        if let Some(value) = data.strip_prefix("threshold_") {
            match value.parse::<f64>() {
                Ok(threshold) => {
                    settings.threshold = threshold;
                    self.notifier
                        .send(&format!("Threshold set to {:.2}%.", threshold * 100.0))
                        .await;
                }
                Err(_) => self.notifier.send("Invalid threshold value received.").await,
            }
        } else if let Some(owner) = data.strip_prefix("follow_") {
            if owner == "all" {
                settings.followed_owners.clear();
                self.notifier.send("Now scanning all coins without filters.").await;
            } else {
                if !settings.followed_owners.remove(owner) {
                    settings.followed_owners.insert(owner.to_string());
                }
                self.notifier
                    .send(&format!("Now following: {}", settings.followed_list("None")))
                    .await;
            }
        } else {
            debug!(data, "unrecognized callback payload");
        }

        if self.processed_callbacks.len() > PROCESSED_CALLBACK_CAP {
            self.processed_callbacks.clear();
        }
    }
}

/// Render the /view_settings report.
pub(crate) fn settings_summary(settings: &WatchSettings) -> String {
    format!(
        "Current settings:\nThreshold: {:.2}%\nFollowing owners: {}",
        settings.threshold * 100.0,
        settings.followed_list("No Filter")
    )
}
