//! Xunlei Pan implementation of [`DriveProvider`].
//!
//! Thin adapter over the `xunlei-client` crate: obtains an access token from
//! the account's token cache, then drives the provider's share/restore/task
//! endpoints. Auth travels as a per-call argument; nothing on the shared
//! client mutates between requests.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::info;
use xunlei_client::XunleiClient;

use crate::domains::accounts::{AccessTokenCache, FreshToken, TokenRefresher};

use super::traits::{DriveAccountInfo, DriveProvider, DriveService, RemoteEntry, TransferOutcome};

/// Adapter exposing the client's token endpoint to the account token cache.
pub struct XunleiTokenRefresher(pub Arc<XunleiClient>);

#[async_trait]
impl TokenRefresher for XunleiTokenRefresher {
    async fn refresh(&self, refresh_secret: &str) -> Result<FreshToken> {
        let grant = self
            .0
            .refresh_access_token(refresh_secret)
            .await
            .context("token refresh failed")?;

        Ok(FreshToken {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_in_secs: grant.expires_in,
        })
    }
}

pub struct XunleiDrive {
    client: Arc<XunleiClient>,
    tokens: Arc<AccessTokenCache>,
}

impl XunleiDrive {
    pub fn new(client: Arc<XunleiClient>, tokens: Arc<AccessTokenCache>) -> Self {
        Self { client, tokens }
    }
}

#[async_trait]
impl DriveProvider for XunleiDrive {
    fn service(&self) -> DriveService {
        DriveService::Xunlei
    }

    async fn transfer(&self, share_id: &str) -> Result<TransferOutcome> {
        let token = self.tokens.token().await?;

        let detail = self
            .client
            .share_detail(&token, share_id, None)
            .await
            .context("failed to resolve share")?;

        let file_ids: Vec<String> = detail.files.iter().map(|f| f.id.clone()).collect();
        if file_ids.is_empty() {
            bail!("share {share_id} contains no files");
        }

        info!(
            share_id,
            files = file_ids.len(),
            title = detail.title.as_deref().unwrap_or(""),
            "restoring shared files"
        );
        let task_id = self
            .client
            .restore(&token, share_id, detail.pass_code_token.as_deref(), &file_ids)
            .await
            .context("restore submission failed")?;

        self.client
            .wait_for_task(&token, &task_id)
            .await
            .context("restore did not complete")?;

        let title = detail.title.clone().unwrap_or_else(|| share_id.to_string());
        let grant = self
            .client
            .create_share(&token, &file_ids, &title)
            .await
            .context("re-share failed")?;

        info!(share_id, share_url = %grant.share_url, "transfer complete");
        Ok(TransferOutcome {
            share_url: grant.share_url,
            pass_code: grant.pass_code,
            title: detail.title,
            file_ids,
        })
    }

    async fn list_files(&self, parent_id: &str) -> Result<Vec<RemoteEntry>> {
        let token = self.tokens.token().await?;
        let files = self
            .client
            .list_files(&token, parent_id)
            .await
            .context("failed to list files")?;

        Ok(files
            .into_iter()
            .map(|f| RemoteEntry {
                folder: matches!(f.kind.as_deref(), Some("drive#folder")),
                size: f.size.as_deref().and_then(|s| s.parse().ok()),
                id: f.id,
                name: f.name,
            })
            .collect())
    }

    async fn delete_files(&self, file_ids: &[String]) -> Result<()> {
        let token = self.tokens.token().await?;
        self.client
            .delete_files(&token, file_ids)
            .await
            .context("failed to delete files")?;
        Ok(())
    }

    async fn user_info(&self) -> Result<DriveAccountInfo> {
        let token = self.tokens.token().await?;
        let info = self
            .client
            .user_info(&token)
            .await
            .context("failed to fetch account info")?;

        Ok(DriveAccountInfo {
            username: info.username,
            vip: info.vip,
            used_space: info.used_space,
            total_space: info.total_space,
        })
    }
}
