// Main entry point for the transfer engine daemon

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xunlei_client::{PollConfig, XunleiClient};

use server_core::domains::accounts::{AccessTokenCache, PostgresAccountStore};
use server_core::domains::resources::PostgresResourceStore;
use server_core::domains::transfer::TransferProcessor;
use server_core::kernel::tasks::{PostgresTaskStore, TaskManager};
use server_core::kernel::{ServerDeps, XunleiDrive, XunleiTokenRefresher};
use server_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pansave transfer engine");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Wire dependencies
    let client = Arc::new(XunleiClient::new().with_poll_config(PollConfig {
        interval: Duration::from_secs(config.poll_interval_secs),
        max_attempts: config.poll_max_attempts,
    }));
    let accounts = Arc::new(PostgresAccountStore::new(pool.clone()));
    let tokens = Arc::new(AccessTokenCache::new(
        config.drive_account_id,
        Arc::new(XunleiTokenRefresher(client.clone())),
        accounts.clone(),
    ));
    let provider = Arc::new(XunleiDrive::new(client, tokens));

    let deps = ServerDeps::new(
        pool.clone(),
        Arc::new(PostgresTaskStore::new(pool.clone())),
        Arc::new(PostgresResourceStore::new(pool.clone())),
        accounts,
        provider,
    );

    // Task engine
    let manager = Arc::new(TaskManager::new(deps.tasks.clone()));
    manager.register_processor(Arc::new(TransferProcessor::new(
        deps.resources.clone(),
        deps.provider.clone(),
    )));

    // Restart whatever the previous process left running
    let recovered = manager
        .recover_running_tasks()
        .await
        .context("Failed to recover interrupted tasks")?;
    tracing::info!(recovered, "Transfer engine ready");

    // Run until interrupted
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received; pausing running tasks");

    for task_id in manager.running_task_ids() {
        if let Err(e) = manager.pause_task(task_id).await {
            tracing::warn!(task_id = %task_id, error = %e, "failed to pause task on shutdown");
        }
    }

    tracing::info!("Transfer engine stopped");
    Ok(())
}
