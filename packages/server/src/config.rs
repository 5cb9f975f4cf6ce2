use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use uuid::Uuid;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Drive account used for transfers (row id in pan_accounts).
    pub drive_account_id: Uuid,
    /// Seconds between polls of a provider-side task.
    pub poll_interval_secs: u64,
    /// Poll attempts before a provider-side task counts as timed out.
    pub poll_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            drive_account_id: env::var("DRIVE_ACCOUNT_ID")
                .context("DRIVE_ACCOUNT_ID must be set")?
                .parse()
                .context("DRIVE_ACCOUNT_ID must be a valid UUID")?,
            poll_interval_secs: env::var("TRANSFER_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("TRANSFER_POLL_INTERVAL_SECS must be a valid number")?,
            poll_max_attempts: env::var("TRANSFER_POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("TRANSFER_POLL_MAX_ATTEMPTS must be a valid number")?,
        })
    }
}
