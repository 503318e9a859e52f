//! Educore - storage and configuration for the Edubot Telegram bot
//!
//! Nothing in this crate knows about Telegram. It owns:
//!
//! - `config`: the process configuration, read once at startup
//! - `error`: the shared error taxonomy
//! - `logging`: logger initialization
//! - `storage`: the SQLite store (chat records, study catalog, migrations)

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use storage::{CatalogItem, ChatRecord, ChatUpdate, FieldUpdate, Resource, Store};
