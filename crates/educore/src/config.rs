//! Process configuration
//!
//! Everything the bot reads from the environment is collected here once at
//! startup (after `.env` has been loaded by the binary) and handed to the
//! store, the bot bootstrap and the webhook gateway. No other module reads
//! environment variables.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use log::LevelFilter;
use secrecy::SecretString;
use url::Url;

use crate::error::{AppError, AppResult};

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "education_full.db";

/// Default HTTP port for the webhook gateway.
pub const DEFAULT_PORT: u16 = 8080;

/// Default timeout for outbound Bot API requests (in seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the webhook route, appended to `APP_URL` when registering.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Runtime configuration for the bot.
#[derive(Debug)]
pub struct Config {
    /// Bot token, from BOT_TOKEN or TELOXIDE_TOKEN
    pub bot_token: Option<SecretString>,
    /// Public base URL Telegram pushes updates to, from APP_URL
    pub app_url: Option<Url>,
    /// Value Telegram echoes in `X-Telegram-Bot-Api-Secret-Token`, from WEBHOOK_SECRET
    pub webhook_secret: Option<SecretString>,
    /// SQLite file, from DATABASE_PATH
    pub database_path: PathBuf,
    /// Listen address for the gateway, from BIND_ADDR and PORT
    pub bind_addr: SocketAddr,
    /// Custom (local) Bot API server, from BOT_API_URL
    pub bot_api_url: Option<Url>,
    /// Optional log file, from LOG_FILE_PATH
    pub log_file_path: Option<PathBuf>,
    /// Log level, from LOG_LEVEL
    pub log_level: LevelFilter,
    /// Outbound request timeout, from REQUEST_TIMEOUT_SECS
    pub request_timeout: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN").or_else(|| get("TELOXIDE_TOKEN")).map(SecretString::from);
        let webhook_secret = get("WEBHOOK_SECRET").map(SecretString::from);

        let app_url = get("APP_URL").map(|raw| parse_url("APP_URL", &raw)).transpose()?;
        let bot_api_url = get("BOT_API_URL")
            .map(|raw| parse_url("BOT_API_URL", &raw))
            .transpose()?;

        let database_path = get("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let ip = match get("BIND_ADDR") {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|e| AppError::Config(format!("Invalid BIND_ADDR '{}': {}", raw, e)))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let log_level = match get("LOG_LEVEL") {
            Some(raw) => raw
                .parse::<LevelFilter>()
                .map_err(|e| AppError::Config(format!("Invalid LOG_LEVEL '{}': {}", raw, e)))?,
            None => LevelFilter::Info,
        };

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .map_err(|e| AppError::Config(format!("Invalid REQUEST_TIMEOUT_SECS '{}': {}", raw, e)))?,
            ),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            bot_token,
            app_url,
            webhook_secret,
            database_path,
            bind_addr: SocketAddr::new(ip, port),
            bot_api_url,
            log_file_path: get("LOG_FILE_PATH").map(PathBuf::from),
            log_level,
            request_timeout,
        })
    }

    /// Fails unless everything needed to serve webhook traffic is present.
    pub fn require_serving(&self) -> AppResult<()> {
        let mut missing = Vec::new();
        if self.bot_token.is_none() {
            missing.push("BOT_TOKEN");
        }
        if self.app_url.is_none() {
            missing.push("APP_URL");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!("{} missing", missing.join(" and "))))
        }
    }

    /// Full webhook URL registered with Telegram (`APP_URL` + `/webhook`).
    pub fn webhook_url(&self) -> AppResult<Url> {
        let base = self
            .app_url
            .as_ref()
            .ok_or_else(|| AppError::Config("APP_URL missing".to_string()))?;
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), WEBHOOK_PATH);
        parse_url("APP_URL", &joined)
    }
}

fn parse_url(key: &str, raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|e| AppError::Config(format!("Invalid {} '{}': {}", key, raw, e)))
}
