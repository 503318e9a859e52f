use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;
use tokio::net::TcpListener;
use tokio::signal;

use edubot::cli::{Cli, Commands};
use edubot::gateway::{serve, Gateway};
use edubot::navigation::build_dispatcher;
use edubot::telegram::{create_bot, register_webhook, setup_bot_commands, TelegramSender};
use educore::logging::init_logger;
use educore::storage::CatalogSeed;
use educore::{Config, Store};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the matching subcommand.
///
/// # Errors
/// Returns an error if initialization fails (configuration, logging,
/// database, bot creation) or the server cannot bind.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();
    let config = Config::from_env()?;

    init_logger(config.log_level, config.log_file_path.as_deref())?;

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {}", panic_info);
    }));

    // Refuse to start without a migrated store
    let store = Store::initialize(&config.database_path)?;

    match cli.command() {
        Commands::Run => run_bot(config, store).await,
        Commands::Migrate => {
            // Store::initialize has already applied and logged anything pending
            log::info!(
                "Migrations up to date ({} recorded)",
                store.applied_migration_count()?
            );
            Ok(())
        }
        Commands::Seed { file } => {
            let seed = CatalogSeed::from_path(&file)?;
            let summary = store.seed_catalog(&seed)?;
            log::info!(
                "Catalog replaced from {}: {} stages, {} terms, {} grades, {} subjects, {} resources ({} chats reset)",
                file.display(),
                summary.stages,
                summary.terms,
                summary.grades,
                summary.subjects,
                summary.resources,
                summary.chats_reset
            );
            Ok(())
        }
    }
}

/// Registers the webhook and serves updates until Ctrl+C.
async fn run_bot(config: Config, store: Store) -> Result<()> {
    config.require_serving()?;
    log::info!("Starting bot with {} known chat(s)", store.chat_count()?);

    let bot = create_bot(&config)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }
    register_webhook(&bot, &config).await?;

    let dispatcher = Arc::new(build_dispatcher(store));
    let sender = Arc::new(TelegramSender::new(bot.clone()));
    let router = Gateway::from_config(&config, dispatcher, sender).router();

    let listener = TcpListener::bind(config.bind_addr).await?;
    serve(listener, router, shutdown_signal()).await?;

    if let Err(e) = bot.delete_webhook().await {
        log::warn!("Failed to delete webhook on shutdown: {}", e);
    }
    log::info!("Bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => log::info!("Received Ctrl+C, shutting down gracefully..."),
        Err(e) => log::error!("Failed to listen for Ctrl+C: {}", e),
    }
}
