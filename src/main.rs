//! # Channel Post Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, restores
//! and starts the post scheduler, and runs the Telegram bot alongside the
//! health check server.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bot;
mod config;
mod database;
mod services;
mod utils;

use crate::bot::handlers::{BotHandler, WizardState};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::services::health::HealthService;
use crate::services::media_group::MediaGroupManager;
use crate::services::scheduler::PostScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channel_post_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    info!("Starting Channel Post Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, Timezone: {}, HTTP Port: {}",
        config.database_url, config.timezone, config.http_port
    );

    info!("Initializing database connection...");
    let db = Arc::new(DatabaseManager::new(&config.database_url).await?);
    info!("Running database migrations...");
    db.run_migrations().await?;
    info!("Database initialized successfully");

    let bot = Bot::new(&config.bot_token);

    let media_groups = Arc::new(MediaGroupManager::new(Duration::from_millis(
        config.media_group_debounce_ms,
    )));

    info!("Initializing post scheduler...");
    let scheduler = Arc::new(PostScheduler::new(bot.clone(), db.clone(), config.clone()).await?);
    let restored = scheduler.restore_from_store().await?;
    scheduler.start().await?;
    info!("Post scheduler started with {} restored job(s)", restored);

    let health_service = HealthService::new(db.clone(), scheduler.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;
    info!("Health check server starting on port {}", config.http_port);

    let dispatcher_deps = dptree::deps![
        InMemStorage::<WizardState>::new(),
        config.clone(),
        db.clone(),
        media_groups,
        scheduler.clone()
    ];

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, BotHandler::schema())
            .dependencies(dispatcher_deps)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Error stopping scheduler: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
