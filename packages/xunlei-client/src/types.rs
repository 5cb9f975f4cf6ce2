use serde::{Deserialize, Serialize};

/// Access token grant returned by the auth host.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Generic `{data, code, msg}` envelope used by the drive host.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
}

/// One file or folder inside a share.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareFile {
    #[serde(rename = "file_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl ShareFile {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind.as_deref(), Some("drive#folder"))
    }
}

/// Resolved contents of a public share.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub files: Vec<ShareFile>,
    /// Share-scoped token for password-protected shares; echoed back on
    /// subsequent calls against the same share.
    #[serde(default)]
    pub pass_code_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestoreData {
    pub task_id: String,
}

/// Status snapshot of an asynchronous provider-side job.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTask {
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub data: Option<RemoteTaskData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteTaskData {
    #[serde(default)]
    pub share_id: Option<String>,
}

/// Newly created share link.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareGrant {
    pub share_url: String,
    #[serde(default)]
    pub pass_code: Option<String>,
}

/// Payload for POST /drive/v1/share/batch.
#[derive(Debug, Clone, Serialize)]
pub struct CreateShareRequest<'a> {
    pub file_ids: &'a [String],
    pub title: &'a str,
    pub need_password: bool,
    pub expiration_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteData {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Basic profile from the user host.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vip_info: Option<VipInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VipInfo {
    #[serde(default)]
    pub is_vip: Option<String>,
}

/// Quota block from GET /drive/v1/about. The provider serializes byte counts
/// as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct About {
    #[serde(default)]
    pub quota: Option<Quota>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Quota {
    #[serde(default)]
    pub limit: String,
    #[serde(default)]
    pub usage: String,
}

impl Quota {
    pub fn limit_bytes(&self) -> i64 {
        self.limit.parse().unwrap_or(0)
    }

    pub fn usage_bytes(&self) -> i64 {
        self.usage.parse().unwrap_or(0)
    }
}

/// Combined account view assembled from the profile and quota endpoints.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub username: String,
    pub vip: bool,
    pub used_space: i64,
    pub total_space: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_parses_decimal_strings() {
        let quota = Quota {
            limit: "107374182400".into(),
            usage: "52428800".into(),
        };
        assert_eq!(quota.limit_bytes(), 107_374_182_400);
        assert_eq!(quota.usage_bytes(), 52_428_800);
    }

    #[test]
    fn quota_tolerates_missing_values() {
        let quota = Quota::default();
        assert_eq!(quota.limit_bytes(), 0);
        assert_eq!(quota.usage_bytes(), 0);
    }

    #[test]
    fn share_detail_deserializes_wire_shape() {
        let raw = r#"{
            "data": {
                "title": "movie pack",
                "files": [
                    {"file_id": "VNa1", "name": "movie.mkv", "kind": "drive#file"},
                    {"file_id": "VNa2", "name": "extras", "kind": "drive#folder"}
                ]
            },
            "code": 0,
            "msg": ""
        }"#;

        let envelope: Envelope<ShareDetail> = serde_json::from_str(raw).unwrap();
        let detail = envelope.data.unwrap();
        assert_eq!(detail.title.as_deref(), Some("movie pack"));
        assert_eq!(detail.files.len(), 2);
        assert!(!detail.files[0].is_folder());
        assert!(detail.files[1].is_folder());
    }
}
