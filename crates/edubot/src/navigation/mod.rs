//! Catalog navigation: the conversation the bot holds with every chat
//!
//! - `steps`: the navigation steps and their menus
//! - `handlers`: route handlers

pub mod handlers;
pub mod steps;

pub use handlers::{format_resources, NO_CONTENT_REPLY, SECTION_NOT_FOUND_REPLY, UNKNOWN_COMMAND_REPLY};
pub use steps::Step;

use educore::Store;

use crate::dispatcher::Dispatcher;
use crate::telegram::{TextUpdate, BACK_BUTTON};

/// Builds the dispatcher the bot runs with.
///
/// The same routes are used in production and in the integration tests.
pub fn build_dispatcher(store: Store) -> Dispatcher {
    Dispatcher::builder(store)
        .command("start", handlers::start)
        .command("help", handlers::help)
        .text("back", |update: &TextUpdate| update.text == BACK_BUTTON, handlers::back)
        .text("unknown_command", |update: &TextUpdate| update.command.is_some(), handlers::unknown_command)
        .default_handler(handlers::select)
        .build()
}
