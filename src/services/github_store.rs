//! src/services/github_store.rs
//!
//! GitHub-backed [`RemoteStore`]. Uploads are committed through the
//! repository contents API beneath `uploads/`, one commit per stored file,
//! and are served back via `raw.githubusercontent.com`. Retrieval lists the
//! uploads directory and matches the requested name against the
//! timestamp-prefixed entries.

use crate::models::remote_object::RemoteObject;
use crate::services::store::{RemoteStore, StoreError, StoreResult, StoredObject};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const GITHUB_API_BASE: &str = "https://api.github.com";
const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

/// Directory inside the backing repository that receives every upload.
const UPLOADS_DIR: &str = "uploads";

#[derive(Clone)]
pub struct GitHubStore {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    token: String,
}

impl GitHubStore {
    /// Create a store for `owner/repo` on `branch`, authenticated with
    /// `token`. Uses a default `reqwest::Client` with a 30 s timeout; the
    /// GitHub API also requires a User-Agent on every request.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self::with_client(owner, repo, branch, token, client)
    }

    /// Create a store with a custom HTTP client (shared pool or tests).
    pub fn with_client(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
        }
    }

    /// Contents-API URL for a path inside the repository.
    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Public fetch URL for a committed path.
    fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            RAW_CONTENT_BASE, self.owner, self.repo, self.branch, path
        )
    }

    /// Build the timestamp-qualified storage path for an upload. The millis
    /// prefix keeps concurrent uploads of the same name on distinct paths.
    fn upload_path(name: &str, unix_millis: i64) -> String {
        format!("{}/{}-{}", UPLOADS_DIR, unix_millis, name)
    }

    /// Pick the listing entry for `name`: stored entries are
    /// `<millis>-<name>`, so match by suffix and prefer the newest upload.
    /// The millis prefixes share a digit count for any realistic clock, so
    /// the lexicographically greatest match is the most recent one.
    fn find_match<'a>(entries: &'a [RemoteObject], name: &str) -> Option<&'a RemoteObject> {
        let suffix = format!("-{}", name);
        entries
            .iter()
            .filter(|entry| entry.name.ends_with(&suffix))
            .max_by(|a, b| a.name.cmp(&b.name))
    }
}

#[async_trait]
impl RemoteStore for GitHubStore {
    async fn store(&self, name: &str, bytes: Bytes) -> StoreResult<StoredObject> {
        let path = Self::upload_path(name, Utc::now().timestamp_millis());
        let body = json!({
            "message": format!("Upload: {}", name),
            "content": general_purpose::STANDARD.encode(&bytes),
            "branch": self.branch,
        });

        debug!(%path, size = bytes.len(), "committing upload");

        let response = self
            .client
            .put(self.contents_url(&path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(StoredObject {
            raw_url: self.raw_url(&path),
            path,
        })
    }

    async fn resolve(&self, name: &str) -> StoreResult<String> {
        let response = self
            .client
            .get(self.contents_url(UPLOADS_DIR))
            .bearer_auth(&self.token)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // No uploads directory yet: nothing was ever stored.
            warn!(%name, "uploads listing returned 404");
            return Err(StoreError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "uploads listing failed");
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let entries: Vec<RemoteObject> = response.json().await?;
        Self::find_match(&entries, name)
            .and_then(|entry| entry.download_url.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        let url = format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo);
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}
