//! Telegram alert and command surface for the coinwatch bot.
//!
//! This crate provides:
//! - The Telegram transport (send + long-poll updates)
//! - The notifier gate that drops outbound messages when muted
//! - The chat command processor mutating shared watch settings
//! - The file-backed coin registry

pub mod commands;
pub mod notifier;
pub mod registry;
pub mod telegram;

pub use commands::{command_overview, Command, CommandProcessor};
pub use notifier::Notifier;
pub use registry::{CoinRegistry, RegistryError};
pub use telegram::{TelegramBot, TelegramError};
