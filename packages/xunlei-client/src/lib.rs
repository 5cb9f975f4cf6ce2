//! Pure Xunlei Pan (Thunder cloud drive) REST API client.
//!
//! A minimal client for the Xunlei drive API. Supports refreshing access
//! tokens, resolving public shares, restoring shared files into the account,
//! polling the provider's asynchronous task endpoint, and re-sharing the
//! restored files.
//!
//! Mutating calls (`restore`, `create_share`, `delete_files`) are
//! asynchronous on the provider's side: they return a task id immediately
//! and the real work finishes later. [`XunleiClient::wait_for_task`] polls
//! the task endpoint on a fixed cadence until the job completes, fails, or
//! the attempt budget runs out.
//!
//! # Example
//!
//! ```rust,ignore
//! use xunlei_client::XunleiClient;
//!
//! let client = XunleiClient::new();
//! let grant = client.refresh_access_token("refresh-token").await?;
//!
//! let detail = client.share_detail(&grant.access_token, "VNtz9aAbCdEf", None).await?;
//! let file_ids: Vec<String> = detail.files.iter().map(|f| f.id.clone()).collect();
//!
//! let task_id = client.restore(&grant.access_token, "VNtz9aAbCdEf", None, &file_ids).await?;
//! client.wait_for_task(&grant.access_token, &task_id).await?;
//!
//! let share = client.create_share(&grant.access_token, &file_ids, "my copy").await?;
//! println!("{}", share.share_url);
//! ```

pub mod error;
pub mod poll;
pub mod types;

pub use error::{Result, XunleiError};
pub use poll::{PollConfig, PollState};
pub use types::{
    AccountInfo, Envelope, RemoteFile, RemoteTask, ShareDetail, ShareFile, ShareGrant, TokenGrant,
};

use serde::de::DeserializeOwned;
use serde_json::json;

use types::{About, CreateShareRequest, DeleteData, FileList, RestoreData, UserProfile};

const USER_HOST: &str = "https://xluser-ssl.xunlei.com";
const DRIVE_HOST: &str = "https://api-pan.xunlei.com";

/// OAuth client id registered for the Pan web app.
const CLIENT_ID: &str = "Xqp0kJBXWhwaTpB6";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Remote task status meaning the job finished successfully.
const TASK_STATUS_COMPLETE: i32 = 2;

/// Error marker the provider emits when the account is out of space. Seen in
/// the task endpoint's failure message; aborts polling immediately.
const CAPACITY_LIMIT_MARKER: &str = "capacity limit";

pub struct XunleiClient {
    client: reqwest::Client,
    user_host: String,
    drive_host: String,
    poll: PollConfig,
}

impl Default for XunleiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl XunleiClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            user_host: USER_HOST.to_string(),
            drive_host: DRIVE_HOST.to_string(),
            poll: PollConfig::default(),
        }
    }

    /// Override the poll cadence/budget for remote tasks.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Point the client at different hosts (integration testing).
    pub fn with_hosts(mut self, user_host: impl Into<String>, drive_host: impl Into<String>) -> Self {
        self.user_host = user_host.into();
        self.drive_host = drive_host.into();
        self
    }

    /// Exchange the stored refresh token for a fresh access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        let url = format!("{}/v1/auth/token", self.user_host);
        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
            "client_id": CLIENT_ID,
        });

        let resp = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .header("X-Client-Id", CLIENT_ID)
            .json(&body)
            .send()
            .await?;

        read_json(resp).await
    }

    /// Resolve a public share id into its file listing and title.
    pub async fn share_detail(
        &self,
        auth: &str,
        share_id: &str,
        pass_code_token: Option<&str>,
    ) -> Result<ShareDetail> {
        let url = format!("{}/drive/v1/share/detail", self.drive_host);
        let body = json!({
            "share_id": share_id,
            "pass_code_token": pass_code_token.unwrap_or(""),
            "parent_id": "",
            "limit": 100,
            "thumbnail_size": "SIZE_LARGE",
            "order": "6",
        });

        let resp = self.authed(self.client.post(&url), auth).json(&body).send().await?;
        let envelope: Envelope<ShareDetail> = read_json(resp).await?;
        unwrap_envelope(envelope, "share detail")
    }

    /// Restore (copy) shared files into the account. Returns the remote task
    /// id; the copy itself completes asynchronously.
    pub async fn restore(
        &self,
        auth: &str,
        share_id: &str,
        pass_code_token: Option<&str>,
        file_ids: &[String],
    ) -> Result<String> {
        let url = format!("{}/drive/v1/share/restore", self.drive_host);
        let body = json!({
            "share_id": share_id,
            "pass_code_token": pass_code_token.unwrap_or(""),
            "file_ids": file_ids,
            "folder_type": "NORMAL",
            "specify_parent_id": true,
            "parent_id": "",
        });

        let resp = self.authed(self.client.post(&url), auth).json(&body).send().await?;
        let envelope: Envelope<RestoreData> = read_json(resp).await?;
        Ok(unwrap_envelope(envelope, "restore")?.task_id)
    }

    /// Fetch one status snapshot of a remote task.
    pub async fn task_status(&self, auth: &str, task_id: &str, retry_index: u32) -> Result<RemoteTask> {
        let url = format!("{}/drive/v1/task", self.drive_host);
        let retry_index = retry_index.to_string();
        let resp = self
            .authed(self.client.get(&url), auth)
            .query(&[("task_id", task_id), ("retry_index", retry_index.as_str())])
            .send()
            .await?;

        read_json(resp).await
    }

    /// Poll a remote task until it completes.
    ///
    /// Each poll either finds the job still in progress (keep going),
    /// complete (done), or failed. A failure whose message carries the
    /// provider's capacity marker becomes [`XunleiError::CapacityExceeded`]
    /// and aborts immediately; exhausting the attempt budget yields
    /// [`XunleiError::TaskTimeout`] instead.
    pub async fn wait_for_task(&self, auth: &str, task_id: &str) -> Result<RemoteTask> {
        poll::poll_until_complete(&self.poll, |retry_index| async move {
            match self.task_status(auth, task_id, retry_index).await {
                Ok(task) if task.status == TASK_STATUS_COMPLETE => Ok(PollState::Done(task)),
                Ok(task) => {
                    tracing::debug!(task_id, status = task.status, "remote task still in progress");
                    Ok(PollState::InProgress)
                }
                Err(XunleiError::Api { message, .. })
                    if message.contains(CAPACITY_LIMIT_MARKER) =>
                {
                    Err(XunleiError::CapacityExceeded)
                }
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// Create a public share for the given files. `expiration_days: 0` means
    /// the link never expires.
    pub async fn create_share(&self, auth: &str, file_ids: &[String], title: &str) -> Result<ShareGrant> {
        let url = format!("{}/drive/v1/share/batch", self.drive_host);
        let body = CreateShareRequest {
            file_ids,
            title,
            need_password: false,
            expiration_days: 0,
        };

        let resp = self.authed(self.client.post(&url), auth).json(&body).send().await?;
        let envelope: Envelope<ShareGrant> = read_json(resp).await?;
        unwrap_envelope(envelope, "create share")
    }

    /// List files under a folder ("" for the drive root).
    pub async fn list_files(&self, auth: &str, parent_id: &str) -> Result<Vec<RemoteFile>> {
        let url = format!("{}/drive/v1/files", self.drive_host);
        let resp = self
            .authed(self.client.get(&url), auth)
            .query(&[("parent_id", parent_id), ("limit", "100")])
            .send()
            .await?;

        let list: FileList = read_json(resp).await?;
        Ok(list.files)
    }

    /// Move files to the trash. When the provider hands back a task id the
    /// call waits for that task, so deletion is confirmed on return.
    pub async fn delete_files(&self, auth: &str, file_ids: &[String]) -> Result<()> {
        let url = format!("{}/drive/v1/files:batchTrash", self.drive_host);
        let body = json!({ "ids": file_ids });

        let resp = self.authed(self.client.post(&url), auth).json(&body).send().await?;
        let data: DeleteData = read_json(resp).await?;

        if let Some(task_id) = data.task_id {
            tracing::debug!(task_id, "waiting for delete task");
            self.wait_for_task(auth, &task_id).await?;
        }

        Ok(())
    }

    /// Fetch the account's profile plus storage quota.
    pub async fn user_info(&self, auth: &str) -> Result<AccountInfo> {
        let profile_url = format!("{}/v1/user/me", self.user_host);
        let resp = self.authed(self.client.get(&profile_url), auth).send().await?;
        let profile: UserProfile = read_json(resp).await?;

        let about_url = format!("{}/drive/v1/about", self.drive_host);
        let resp = self.authed(self.client.get(&about_url), auth).send().await?;
        let about: About = read_json(resp).await?;

        let quota = about.quota.unwrap_or_default();
        let vip = profile
            .vip_info
            .as_ref()
            .and_then(|v| v.is_vip.as_deref())
            .map(|v| v != "0")
            .unwrap_or(false);

        Ok(AccountInfo {
            username: profile.name,
            vip,
            used_space: quota.usage_bytes(),
            total_space: quota.limit_bytes(),
        })
    }

    /// Attach the per-request headers. Auth travels with each call instead of
    /// living in shared client state.
    fn authed(&self, req: reqwest::RequestBuilder, auth: &str) -> reqwest::RequestBuilder {
        req.header("User-Agent", USER_AGENT)
            .header("X-Client-Id", CLIENT_ID)
            .bearer_auth(auth)
    }
}

/// Check the HTTP status and decode the body. Non-2xx responses surface the
/// raw body as the API message so provider error markers survive intact.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(XunleiError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| XunleiError::Unexpected(format!("failed to decode response: {e}: {body}")))
}

/// Reject `{code != 0}` envelopes and unwrap the data payload.
fn unwrap_envelope<T>(envelope: Envelope<T>, operation: &str) -> Result<T> {
    if envelope.code != 0 {
        return Err(XunleiError::Api {
            status: 200,
            message: envelope
                .msg
                .unwrap_or_else(|| format!("{operation} rejected with code {}", envelope.code)),
        });
    }

    envelope
        .data
        .ok_or_else(|| XunleiError::Unexpected(format!("{operation} response had no data")))
}
