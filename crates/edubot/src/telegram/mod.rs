//! Telegram integration: inbound updates, reply keyboards, outbound sending

pub mod bot;
pub mod keyboard;
pub mod sender;
pub mod update;

// Re-exports for convenience
pub use bot::{create_bot, register_webhook, setup_bot_commands, Command};
pub use keyboard::{ReplyKeyboard, BACK_BUTTON};
pub use sender::{deliver, MessageSender, OutboundMessage, SendError, TelegramSender};
pub use update::{ParsedCommand, TextUpdate, Update};
