//! Access token caching for one drive account.
//!
//! Transfers run in bursts, so re-authenticating per saga would hammer the
//! auth endpoint. The cache hands out the in-memory token while it is fresh
//! and refreshes it through the account's stored refresh secret otherwise.
//! A refreshed token is persisted back onto the account row before anyone
//! gets to use it: proceeding on an unpersisted token would strand the
//! rotated refresh secret on a crash.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::store::AccountStore;

/// Fresh token pair minted from a refresh secret.
#[derive(Debug, Clone)]
pub struct FreshToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
}

/// Mints a new access token from a stored refresh secret.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_secret: &str) -> Result<FreshToken>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

pub struct AccessTokenCache {
    account_id: Uuid,
    refresher: Arc<dyn TokenRefresher>,
    accounts: Arc<dyn AccountStore>,
    /// Subtracted from the provider's `expires_in` when computing the cached
    /// expiry, so a token is never used right at the edge of its lifetime.
    safety_margin: Duration,
    cached: RwLock<Option<CachedToken>>,
}

impl AccessTokenCache {
    pub fn new(
        account_id: Uuid,
        refresher: Arc<dyn TokenRefresher>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            account_id,
            refresher,
            accounts,
            safety_margin: Duration::seconds(60),
            cached: RwLock::new(None),
        }
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Get a usable access token, refreshing if the cached one expired.
    ///
    /// Readers take the read lock (the common case); a refresher takes the
    /// write lock and re-checks freshness after acquiring it, so concurrent
    /// callers racing past an expired token trigger exactly one refresh.
    pub async fn token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.is_fresh() {
                    return Ok(entry.token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        if let Some(entry) = cached.as_ref() {
            if entry.is_fresh() {
                return Ok(entry.token.clone());
            }
        }

        let account = self
            .accounts
            .find_account(self.account_id)
            .await?
            .with_context(|| format!("drive account {} not found", self.account_id))?;

        // A token persisted by a previous process may still be fresh; adopt
        // it instead of burning a refresh.
        if let (Some(token), Some(expires_at)) = (&account.access_token, account.token_expires_at) {
            if Utc::now() < expires_at {
                debug!(account_id = %self.account_id, "adopting persisted access token");
                *cached = Some(CachedToken {
                    token: token.clone(),
                    expires_at,
                });
                return Ok(token.clone());
            }
        }

        let fresh = self.refresher.refresh(&account.refresh_secret).await?;
        let expires_at = Utc::now() + Duration::seconds(fresh.expires_in_secs) - self.safety_margin;

        self.accounts
            .persist_token(
                self.account_id,
                &fresh.access_token,
                &fresh.refresh_token,
                expires_at,
            )
            .await
            .context("failed to persist refreshed access token")?;

        *cached = Some(CachedToken {
            token: fresh.access_token.clone(),
            expires_at,
        });
        info!(account_id = %self.account_id, "refreshed drive access token");

        Ok(fresh.access_token)
    }
}
