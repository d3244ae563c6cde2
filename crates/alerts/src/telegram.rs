//! Telegram transport: outbound messages and inbound update polling.

use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, InlineKeyboardMarkup, ParseMode, Update};
use thiserror::Error;

/// Overall HTTP timeout; must exceed the long-poll wait below.
const HTTP_TIMEOUT: Duration = Duration::from_secs(35);

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Bot bound to a single destination chat.
pub struct TelegramBot {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramBot {
    pub fn new(token: &str, chat_id: i64) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            bot: Bot::with_client(token, client),
            chat_id: ChatId(chat_id),
        })
    }

    /// Send a Markdown message, optionally with an inline keyboard.
    pub async fn send(
        &self,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut request = self
            .bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Markdown);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await?;
        Ok(())
    }

    /// Long-poll for updates strictly after the watermark.
    pub async fn updates(
        &self,
        watermark: Option<i32>,
        timeout_secs: u32,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut request = self
            .bot
            .get_updates()
            .timeout(timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);
        if let Some(id) = watermark {
            request = request.offset(id + 1);
        }
        Ok(request.await?)
    }

    /// Skip any backlog accumulated while the bot was down; returns the id of
    /// the newest pending update, if any, to seed the watermark.
    pub async fn fast_forward(&self) -> Result<Option<i32>, TelegramError> {
        let updates = self.bot.get_updates().offset(-1).timeout(0).await?;
        Ok(updates.last().map(|u| u.id.0 as i32))
    }

    /// Bot wired to an unroutable endpoint so sends fail fast offline.
    #[cfg(test)]
    pub(crate) fn unconnected() -> Self {
        let api_url = url::Url::parse("http://127.0.0.1:1/").unwrap();
        Self {
            bot: Bot::new("123:test-token").set_api_url(api_url),
            chat_id: ChatId(1),
        }
    }
}
