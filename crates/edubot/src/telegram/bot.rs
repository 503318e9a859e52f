//! Bot initialization and webhook registration
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Webhook registration with Telegram

use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use educore::{AppError, Config};

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "الأوامر المتاحة:")]
pub enum Command {
    #[command(description = "عرض المراحل الدراسية")]
    Start,
    #[command(description = "طريقة استخدام البوت")]
    Help,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token or the HTTP client could not be built
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    let token = config
        .bot_token
        .as_ref()
        .ok_or_else(|| AppError::Config("BOT_TOKEN missing".to_string()))?;
    let client = ClientBuilder::new().timeout(config.request_timeout).build()?;

    let bot = Bot::with_client(token.expose_secret(), client);
    let bot = match &config.bot_api_url {
        Some(url) => {
            log::info!("Using custom Bot API URL: {}", url);
            bot.set_api_url(url.clone())
        }
        None => bot,
    };

    Ok(bot)
}

/// Points Telegram at our `/webhook` route
///
/// The configured secret, if any, is registered too; Telegram then sends it
/// back in the `X-Telegram-Bot-Api-Secret-Token` header of every delivery.
pub async fn register_webhook(bot: &Bot, config: &Config) -> anyhow::Result<()> {
    let url = config.webhook_url()?;

    let mut request = bot.set_webhook(url.clone());
    if let Some(secret) = &config.webhook_secret {
        request = request.secret_token(secret.expose_secret().to_string());
    }
    request.await?;

    log::info!("Webhook set to {}", url);
    Ok(())
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let command_list = Command::descriptions().to_string();

        assert!(command_list.contains("الأوامر المتاحة"));
        assert!(command_list.contains("/start"));
        assert!(command_list.contains("/help"));
    }

    #[test]
    fn test_bot_commands_match_enum() {
        let commands = Command::bot_commands();
        let names: Vec<&str> = commands
            .iter()
            .map(|c| c.command.trim_start_matches('/'))
            .collect();
        assert_eq!(names, vec!["start", "help"]);
    }

    #[test]
    fn test_create_bot_requires_token() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(create_bot(&config).is_err());
    }
}
