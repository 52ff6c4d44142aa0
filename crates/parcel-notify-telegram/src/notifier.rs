//! Telegram notifier
//!
//! Delivers plain-text messages with `sendMessage`. Destinations are numeric
//! chat ids in their decimal string form.

use async_trait::async_trait;
use parcel_core::traits::Notifier;
use parcel_core::{Error, Result};
use std::fmt;
use teloxide::prelude::*;
use tracing::debug;

/// Notifier backed by a teloxide [`Bot`]
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Create a notifier from a bot token
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Bot::new(token))
    }

    /// The underlying bot handle
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot", &"<redacted>")
            .finish()
    }
}

/// Parse a destination string into a Telegram chat id
pub fn parse_chat_id(destination: &str) -> Result<ChatId> {
    destination
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::delivery(format!("Invalid chat id: '{}'", destination)))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, destination: &str, text: &str) -> Result<()> {
        let chat_id = parse_chat_id(destination)?;

        self.bot
            .send_message(chat_id, text)
            .await
            .map_err(|e| Error::delivery(format!("sendMessage failed: {}", e)))?;

        debug!("Delivered {} chars to chat {}", text.chars().count(), chat_id.0);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "telegram"
    }
}
