//! Trait seams for external services (using traits for testability)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud drive services whose share links the service recognizes. Only
/// services with a [`DriveProvider`] implementation can actually be
/// transferred; the rest are identified for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "drive_service", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DriveService {
    Xunlei,
    Quark,
    Alipan,
    Baidu,
    Uc,
}

impl fmt::Display for DriveService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriveService::Xunlei => "xunlei",
            DriveService::Quark => "quark",
            DriveService::Alipan => "alipan",
            DriveService::Baidu => "baidu",
            DriveService::Uc => "uc",
        };
        f.write_str(name)
    }
}

/// Result of transferring one shared resource into the account.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    /// The re-shared, externally usable link.
    pub share_url: String,
    /// Extraction code for the new share, when the provider issues one.
    pub pass_code: Option<String>,
    /// Title of the original share, when known.
    pub title: Option<String>,
    /// Provider-side ids of the transferred files.
    pub file_ids: Vec<String>,
}

/// One file or folder in the provider's drive.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub folder: bool,
    pub size: Option<i64>,
}

/// Account profile and quota, as reported by the provider.
#[derive(Debug, Clone, Serialize)]
pub struct DriveAccountInfo {
    pub username: String,
    pub vip: bool,
    pub used_space: i64,
    pub total_space: i64,
}

/// A cloud drive provider able to run the full transfer sequence.
///
/// `transfer` performs resolve -> restore -> await -> re-share -> extract as
/// one operation. There is no rollback on partial failure: if re-sharing
/// fails after the restore completed, the restored files stay in the
/// account and the whole call reports the share-stage error.
#[async_trait]
pub trait DriveProvider: Send + Sync {
    fn service(&self) -> DriveService;

    async fn transfer(&self, share_id: &str) -> Result<TransferOutcome>;

    async fn list_files(&self, parent_id: &str) -> Result<Vec<RemoteEntry>>;

    async fn delete_files(&self, file_ids: &[String]) -> Result<()>;

    async fn user_info(&self) -> Result<DriveAccountInfo>;
}
