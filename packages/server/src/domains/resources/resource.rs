//! Transferred resource model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::common::id::db_id;

/// A shared link the service has taken in, plus the re-shared copy once the
/// transfer finished. `save_url` empty means the transfer has not completed
/// for this URL yet.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Resource {
    #[builder(default = db_id())]
    pub id: Uuid,
    pub title: String,
    /// Source share link, unique per resource.
    pub url: String,
    /// Re-shared link in the operator's own account.
    #[builder(default, setter(strip_option))]
    pub save_url: Option<String>,
    /// Extraction code for the re-shared link, when the provider issues one.
    #[builder(default, setter(strip_option))]
    pub access_code: Option<String>,
    #[builder(default)]
    pub category_id: Option<Uuid>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// A resource is transferred once it carries a re-shared link.
    pub fn is_transferred(&self) -> bool {
        self.save_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transferred_requires_nonempty_save_url() {
        let mut resource = Resource::builder()
            .title("pack")
            .url("https://pan.xunlei.com/s/abc")
            .build();
        assert!(!resource.is_transferred());

        resource.save_url = Some(String::new());
        assert!(!resource.is_transferred());

        resource.save_url = Some("https://pan.xunlei.com/s/def".into());
        assert!(resource.is_transferred());
    }
}
