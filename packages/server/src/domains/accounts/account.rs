//! Drive account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::common::id::db_id;
use crate::kernel::traits::DriveService;

/// A provider account usable for transfers.
///
/// Created and rotated by the operator; the engine only ever updates the
/// cached `access_token` / `token_expires_at` pair when a refresh succeeds.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct PanAccount {
    #[builder(default = db_id())]
    pub id: Uuid,
    pub service: DriveService,
    #[builder(default)]
    pub name: String,

    /// Long-lived secret (refresh token) used to mint access tokens.
    pub refresh_secret: String,

    /// Last minted access token, persisted so restarts can reuse it while it
    /// is still fresh.
    #[builder(default, setter(strip_option))]
    pub access_token: Option<String>,
    #[builder(default, setter(strip_option))]
    pub token_expires_at: Option<DateTime<Utc>>,

    #[builder(default = true)]
    pub active: bool,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}
