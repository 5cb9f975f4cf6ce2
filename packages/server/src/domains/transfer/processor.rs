//! The `transfer` task processor.
//!
//! Each item asks for one shared link to be restored into the operator's
//! drive account and re-shared. Validation failures are final for the item;
//! an already-transferred URL short-circuits to success without touching the
//! provider, which also makes re-runs after a crash safe.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::domains::resources::{Resource, ResourceStore};
use crate::kernel::tasks::{TaskItem, TaskProcessor};
use crate::kernel::traits::DriveProvider;

use super::links::parse_share_link;

pub const TRANSFER_TASK_TYPE: &str = "transfer";

/// Item input payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferInput {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

/// Item output payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutput {
    pub resource_id: Uuid,
    pub save_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_code: Option<String>,
    /// True when the URL had already been transferred and the provider was
    /// not contacted again.
    pub already_existed: bool,
}

pub struct TransferProcessor {
    resources: Arc<dyn ResourceStore>,
    provider: Arc<dyn DriveProvider>,
}

impl TransferProcessor {
    pub fn new(resources: Arc<dyn ResourceStore>, provider: Arc<dyn DriveProvider>) -> Self {
        Self {
            resources,
            provider,
        }
    }

    fn parse_input(item: &TaskItem) -> Result<TransferInput> {
        let input: TransferInput = serde_json::from_value(item.input.clone())
            .context("invalid transfer input payload")?;

        if input.title.trim().is_empty() {
            bail!("transfer input is missing a title");
        }
        if input.url.trim().is_empty() {
            bail!("transfer input is missing a share url");
        }

        Ok(input)
    }
}

#[async_trait]
impl TaskProcessor for TransferProcessor {
    fn task_type(&self) -> &'static str {
        TRANSFER_TASK_TYPE
    }

    async fn process(
        &self,
        _cancel: &CancellationToken,
        task_id: Uuid,
        item: &mut TaskItem,
    ) -> Result<()> {
        let input = Self::parse_input(item)?;

        let link = parse_share_link(&input.url)
            .with_context(|| format!("unsupported share link: {}", input.url))?;
        if link.service != self.provider.service() {
            bail!(
                "no provider available for {} links (got {})",
                link.service,
                input.url
            );
        }

        // Idempotency: a resource that already carries a re-shared link is
        // done; report it as success without re-running the transfer.
        let existing = self.resources.find_by_url(&input.url).await?;
        if let Some(resource) = existing.as_ref().filter(|r| r.is_transferred()) {
            info!(
                task_id = %task_id,
                resource_id = %resource.id,
                url = %input.url,
                "resource already transferred, skipping"
            );
            item.output = Some(serde_json::to_value(TransferOutput {
                resource_id: resource.id,
                save_url: resource.save_url.clone().unwrap_or_default(),
                pass_code: resource.access_code.clone(),
                already_existed: true,
            })?);
            return Ok(());
        }

        // Record the resource before the remote work so a transferred share
        // is always attributable to a row, then run the saga. A saga failure
        // leaves the row without a save_url; the next attempt picks it up.
        let resource = match existing {
            Some(resource) => resource,
            None => {
                let resource = Resource::builder()
                    .title(input.title.clone())
                    .url(input.url.clone())
                    .category_id(input.category_id)
                    .build();
                self.resources
                    .insert(&resource)
                    .await
                    .context("failed to record resource")?;
                resource
            }
        };

        let outcome = self.provider.transfer(&link.share_id).await?;

        self.resources
            .update_save_url(resource.id, &outcome.share_url, outcome.pass_code.as_deref())
            .await
            .context("failed to record re-shared link")?;

        info!(
            task_id = %task_id,
            resource_id = %resource.id,
            share_url = %outcome.share_url,
            "transfer recorded"
        );
        item.output = Some(serde_json::to_value(TransferOutput {
            resource_id: resource.id,
            save_url: outcome.share_url,
            pass_code: outcome.pass_code,
            already_existed: false,
        })?);

        Ok(())
    }
}
