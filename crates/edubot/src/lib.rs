//! Edubot - Telegram bot for browsing school study materials
//!
//! Students walk a catalog (stage → term → grade → subject → content type →
//! section) through reply keyboards and get the matching links.
//!
//! # Modules
//!
//! - `cli`: command line interface
//! - `dispatcher`: routes updates to handlers, one update per chat at a time
//! - `gateway`: the webhook HTTP server
//! - `navigation`: the catalog conversation
//! - `telegram`: update model, keyboards, sending, bot bootstrap

pub mod cli;
pub mod dispatcher;
pub mod gateway;
pub mod navigation;
pub mod telegram;

// Re-export commonly used types
pub use dispatcher::{DispatchError, Dispatcher, Handler, HandlerContext, HandlerError, HandlerResult};
pub use gateway::Gateway;
pub use navigation::build_dispatcher;
