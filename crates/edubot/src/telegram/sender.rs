//! Outbound messages and their delivery through the Bot API

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::keyboard::ReplyKeyboard;

/// A reply produced by a handler, not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<ReplyKeyboard>,
    /// Text is Telegram HTML rather than plain text
    pub html: bool,
}

impl OutboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
            html: false,
        }
    }

    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            html: true,
            ..Self::text(chat_id, text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Error type for senders
pub type SendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Delivers outbound messages to the messaging platform.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError>;
}

/// Sends through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        let mut request = self.bot.send_message(ChatId(message.chat_id), message.text.clone());
        if message.html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(keyboard.to_markup());
        }
        request.await?;
        Ok(())
    }
}

/// Sends `messages` in order. A failed message is logged and skipped; the
/// rest are still attempted. Returns how many were delivered.
pub async fn deliver(sender: &dyn MessageSender, messages: &[OutboundMessage]) -> usize {
    let mut delivered = 0;
    for message in messages {
        match sender.send(message).await {
            Ok(()) => delivered += 1,
            Err(e) => log::error!("Failed to send message to chat {}: {}", message.chat_id, e),
        }
    }
    delivered
}
