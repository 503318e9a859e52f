//! Database, migrations, chat records and the study catalog

pub mod catalog;
pub mod chats;
pub mod db;
pub mod migrations;
pub mod seed;

// Re-exports for convenience
pub use catalog::{CatalogItem, Resource};
pub use chats::{ChatRecord, ChatUpdate, FieldUpdate, DEFAULT_STATUS};
pub use db::{DbConnection, DbPool, Store};
pub use seed::{CatalogSeed, SeedSummary};
