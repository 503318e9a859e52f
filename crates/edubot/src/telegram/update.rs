//! Inbound update model
//!
//! Only the parts of a Telegram `Update` the bot acts on are modelled;
//! unknown fields are ignored so new Bot API fields never break
//! deserialization. A payload that is not JSON, or whose `message` lacks
//! a `chat.id`, fails to deserialize and is rejected by the gateway.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    #[serde(default)]
    pub edited_message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub message_id: Option<i64>,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<Sender>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// The user who sent a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

/// A `/command` parsed out of message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercase name without the leading slash or `@botname` suffix
    pub name: String,
    /// Everything after the command, trimmed
    pub args: String,
}

impl ParsedCommand {
    /// Parses `/start`, `/Start@EduBot payload`; `None` for plain text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_lowercase(),
            args: args.to_string(),
        })
    }
}

/// A text message, the only kind of update the bot routes.
#[derive(Debug, Clone)]
pub struct TextUpdate {
    pub chat_id: i64,
    pub from: Option<Sender>,
    pub text: String,
    pub command: Option<ParsedCommand>,
}

impl TextUpdate {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            chat_id,
            from: None,
            command: ParsedCommand::parse(&text),
            text,
        }
    }

    pub fn username(&self) -> Option<String> {
        self.from.as_ref().and_then(|u| u.username.clone())
    }

    pub fn first_name(&self) -> Option<String> {
        self.from.as_ref().and_then(|u| u.first_name.clone())
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.command.as_ref().is_some_and(|c| c.name == name)
    }
}

impl Update {
    /// Chat the update belongs to, if any.
    pub fn chat_id(&self) -> Option<i64> {
        self.message().map(|m| m.chat.id)
    }

    fn message(&self) -> Option<&IncomingMessage> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }

    /// The routable text message, or `None` for stickers, photos, member
    /// updates, callback queries and the like.
    ///
    /// Edited messages are not routed; replaying a navigation step because
    /// the user fixed a typo would jump the menu.
    pub fn text_update(&self) -> Option<TextUpdate> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }

        Some(TextUpdate {
            chat_id: message.chat.id,
            from: message.from.clone(),
            command: ParsedCommand::parse(text),
            text: text.to_string(),
        })
    }
}
